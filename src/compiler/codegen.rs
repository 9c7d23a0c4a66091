//! Rust source rendering for compiled policies.

use std::fmt::Write as FmtWrite;

use super::table::{CompiledPolicy, CompiledRule, Guard};

/// Render `table` as a self-contained Rust module named `namespace`.
///
/// The module defines `Effect` and `Policy_<id>::evaluate(subject,
/// resource, action)`: one guarded return per entry in table order, then a
/// trailing deny. `wildcard_match` is emitted only if some guard needs it.
pub(crate) fn render(table: &CompiledPolicy, namespace: &str) -> String {
    let mut out = String::new();
    let needs_glob = table.entries.iter().any(CompiledRule::has_glob);

    let _ = writeln!(out, "// Generated by castellan. Do not edit.");
    let _ = writeln!(out, "// policy id: {}, rules: {}", table.id, table.entries.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "#[allow(non_camel_case_types, dead_code)]");
    let _ = writeln!(out, "pub mod {} {{", namespace);
    let _ = writeln!(out, "    #[derive(Debug, Clone, Copy, PartialEq, Eq)]");
    let _ = writeln!(out, "    pub enum Effect {{");
    let _ = writeln!(out, "        Allow,");
    let _ = writeln!(out, "        Deny,");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub struct Policy_{};", table.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "    impl Policy_{} {{", table.id);
    let _ = writeln!(out, "        pub const ID: &'static str = \"{}\";", table.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "        #[allow(unused_variables)]");
    let _ = writeln!(
        out,
        "        pub fn evaluate(subject: &str, resource: &str, action: &str) -> Effect {{"
    );

    for entry in &table.entries {
        let _ = writeln!(out, "            // priority {}", entry.priority);
        let _ = writeln!(out, "            if {} {{", condition(entry));
        let _ = writeln!(out, "                return Effect::{};", effect_variant(entry));
        let _ = writeln!(out, "            }}");
    }

    let _ = writeln!(out, "            Effect::Deny");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");

    if needs_glob {
        let _ = writeln!(out);
        out.push_str(WILDCARD_MATCH);
    }

    let _ = writeln!(out, "}}");
    out
}

fn effect_variant(entry: &CompiledRule) -> &'static str {
    if entry.effect.is_allow() { "Allow" } else { "Deny" }
}

fn condition(entry: &CompiledRule) -> String {
    let clauses: Vec<String> = [
        ("subject", &entry.subject),
        ("resource", &entry.resource),
        ("action", &entry.action),
    ]
    .into_iter()
    .filter_map(|(var, guard)| clause(var, guard))
    .collect();

    if clauses.is_empty() {
        "true".to_string()
    } else {
        clauses.join(" && ")
    }
}

fn clause(var: &str, guard: &Guard) -> Option<String> {
    // `{:?}` on a str yields a valid, escaped Rust string literal
    match guard {
        Guard::Any => None,
        Guard::Exact(value) => Some(format!("{} == {:?}", var, value)),
        Guard::Glob(pattern) => Some(format!("wildcard_match({:?}, {})", pattern, var)),
    }
}

const WILDCARD_MATCH: &str = r#"    fn wildcard_match(pattern: &str, value: &str) -> bool {
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
"#;
