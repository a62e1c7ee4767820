//! Configuration access port trait.

/// Raw lookups into a sectioned key/value configuration. Parsing and range
/// checks live in `config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
