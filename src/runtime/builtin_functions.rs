use super::{arithmetic, array, datetime, json, logical, string, type_casting};
use crate::registry::FunctionRegistry;

/// Loads the standard library into `registry`.
pub fn register_builtins(registry: &mut FunctionRegistry) {
    string::register(registry);
    array::register(registry);
    arithmetic::register(registry);
    logical::register(registry);
    type_casting::register(registry);
    json::register(registry);
    datetime::register(registry);
}
