// Core modules implementing the entity model, navigation, and error modeling.
pub mod cursor;
pub mod entity;
pub mod error;
pub mod numeric;
pub mod plate;
pub mod stack;
pub mod well;
pub mod well_set;
