//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements             | Connects to                    |
//! |----------------|------------------------|--------------------------------|
//! | `embedded_pwm` | Board, PwmActuator     | any `embedded-hal` PWM channel |
//! | `log_sink`     | EventSink              | `log` facade                   |
//! | `sim`          | Board, PwmActuator     | in-memory pin recorder         |
//! |                | DistanceSensor         | triangular distance sweep      |

pub mod embedded_pwm;
pub mod log_sink;
pub mod sim;
