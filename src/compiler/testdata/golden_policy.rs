// Generated by castellan. Do not edit.
// policy id: 48e50e45a49457ff, rules: 5

#[allow(non_camel_case_types, dead_code)]
pub mod golden {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Effect {
        Allow,
        Deny,
    }

    pub struct Policy_48e50e45a49457ff;

    impl Policy_48e50e45a49457ff {
        pub const ID: &'static str = "48e50e45a49457ff";

        #[allow(unused_variables)]
        pub fn evaluate(subject: &str, resource: &str, action: &str) -> Effect {
            // priority 50
            if subject == "user:mallory" && wildcard_match("document:*", resource) {
                return Effect::Deny;
            }
            // priority 3
            if wildcard_match("user:?", subject) && wildcard_match("report:*", resource) {
                return Effect::Allow;
            }
            // priority 3
            if subject == "user:1" && resource == "report:secret" && action == "read" {
                return Effect::Deny;
            }
            // priority 1
            if wildcard_match("user:*", subject) && wildcard_match("document:*", resource) && action == "read" {
                return Effect::Allow;
            }
            // priority 1
            if subject == "auditor" && action == "list" {
                return Effect::Allow;
            }
            Effect::Deny
        }
    }

    fn wildcard_match(pattern: &str, value: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let value: Vec<char> = value.chars().collect();
        let (mut p, mut v) = (0, 0);
        let mut star: Option<(usize, usize)> = None;

        while v < value.len() {
            if p < pattern.len() && pattern[p] == '*' {
                star = Some((p, v));
                p += 1;
            } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
                p += 1;
                v += 1;
            } else if let Some((star_p, star_v)) = star {
                p = star_p + 1;
                v = star_v + 1;
                star = Some((star_p, star_v + 1));
            } else {
                return false;
            }
        }

        pattern[p..].iter().all(|c| *c == '*')
    }
}
