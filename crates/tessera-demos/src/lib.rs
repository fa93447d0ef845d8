//! Example scenes used by tessera demos.

/// Box gym scene.
pub mod boxgym;

#[cfg(test)]
mod tests;
