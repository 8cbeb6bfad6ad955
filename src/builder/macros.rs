//! Macros for ergonomic chart construction.

/// Build a [`Patch`](crate::core::Patch) from literal key / value pairs.
///
/// # Example
///
/// ```
/// use waypoint::patch;
///
/// let patch = patch! {
///     "currentSection" => "household",
///     "step" => 3,
/// };
///
/// assert_eq!(patch.len(), 2);
/// assert!(patch! {}.is_empty());
/// ```
#[macro_export]
macro_rules! patch {
    () => {
        $crate::core::Patch::new()
    };
    ($($key:literal => $value:expr),+ $(,)?) => {
        $crate::core::Patch::new()$(.set($key, $value))+
    };
}
