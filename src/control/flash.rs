//! Flash sequence shared by the proximity alarm and the self-test.
//!
//! Three repetitions of full-on / hold / off / hold at 1 kHz.  Every hold
//! and every write is raced against the supplied token.

use embassy_time::Duration;

use crate::app::ports::PwmActuator;
use crate::control::cancel::CancelToken;
use crate::error::FlashError;

/// PWM frequency for every write this crate issues.
pub const PWM_FREQUENCY_HZ: u32 = 1000;

/// On/off pairs per flash sequence.
pub const FLASH_REPETITIONS: usize = 3;

/// Hold time after each on and each off write.
pub const FLASH_HOLD: Duration = Duration::from_millis(200);

/// Run one flash sequence.  Leaves the LED off on success.
pub async fn flash<P: PwmActuator>(pin: &P, token: &CancelToken) -> Result<(), FlashError> {
    for _ in 0..FLASH_REPETITIONS {
        token.guard(pin.set_pwm(1.0, PWM_FREQUENCY_HZ)).await??;
        token.sleep(FLASH_HOLD).await?;
        token.guard(pin.set_pwm(0.0, PWM_FREQUENCY_HZ)).await??;
        token.sleep(FLASH_HOLD).await?;
    }
    Ok(())
}
