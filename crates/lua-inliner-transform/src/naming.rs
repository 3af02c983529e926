//! Hygienic identifier generation.

use lua_inliner_parser::ast::is_keyword;
use std::collections::HashSet;

/// Prefix of the locals that carry an inlined function's return values.
pub const RETURN_PREFIX: &str = "__inline_return";

/// Prefix of the local that absorbs side-effecting values nobody reads.
pub const DISCARD_PREFIX: &str = "__inline_discard";

/// Prefix of the label a `return` inside a loop jumps to.
pub const EXIT_PREFIX: &str = "__inline_exit";

/// Produces `<prefix>__<n>` names that are neither keywords nor taken.
///
/// The counter is shared by every prefix and only ever grows, so two names
/// handed out by the same generator never collide, even when they end up
/// in the same scope.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next: u32,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, prefix: &str, taken: &HashSet<String>) -> String {
        loop {
            let name = format!("{prefix}__{}", self.next);
            self.next = self.next.wrapping_add(1);

            if !is_keyword(&name) && !taken.contains(&name) {
                log::trace!("generated name {name}");
                return name;
            }
            log::trace!("skipping taken name {name}");
        }
    }

    pub fn generate_many(
        &mut self,
        prefix: &str,
        count: usize,
        taken: &HashSet<String>,
    ) -> Vec<String> {
        (0..count).map(|_| self.generate(prefix, taken)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_names_count_up_from_zero() {
        let mut names = NameGenerator::new();
        let none = HashSet::new();
        assert_eq!(names.generate(RETURN_PREFIX, &none), "__inline_return__0");
        assert_eq!(
            names.generate_many(RETURN_PREFIX, 2, &none),
            vec!["__inline_return__1", "__inline_return__2"]
        );
    }

    #[test]
    fn test_taken_names_are_skipped() {
        let mut names = NameGenerator::new();
        let taken = taken(&["__inline_return__0", "__inline_return__2"]);
        assert_eq!(
            names.generate_many(RETURN_PREFIX, 2, &taken),
            vec!["__inline_return__1", "__inline_return__3"]
        );
    }

    #[test]
    fn test_counter_is_shared_between_prefixes() {
        let mut names = NameGenerator::new();
        let none = HashSet::new();
        assert_eq!(names.generate(RETURN_PREFIX, &none), "__inline_return__0");
        assert_eq!(names.generate(DISCARD_PREFIX, &none), "__inline_discard__1");
        assert_eq!(names.generate(EXIT_PREFIX, &none), "__inline_exit__2");
    }
}
