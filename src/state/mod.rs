//! Client-side state modules.
//!
//! DESIGN
//! ======
//! State is split by concern (`messages`, `panel`) so the controller and the
//! panel engine each depend on a small focused model. Both are plain data;
//! I/O lives in `controller` and `engine`.

pub mod messages;
pub mod panel;

#[cfg(test)]
pub mod test_helpers;
