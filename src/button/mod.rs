//! Reset button input.
//!
//! The physical button is expected to show up as an input device (e.g. via
//! the gpio-keys overlay on a Raspberry Pi). Presses are debounced and turned
//! into reset requests for the controller task.

#[cfg(all(feature = "button", target_os = "linux"))]
mod handler;
mod mock;

#[cfg(test)]
mod tests;

#[cfg(all(feature = "button", target_os = "linux"))]
pub use handler::ButtonInputHandler;
pub use mock::MockButton;

