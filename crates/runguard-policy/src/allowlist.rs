//! Command allowlist: executable path → approved argument sequences.
//!
//! Matching is exact on both levels. The executable path is a
//! case-sensitive string key, compared as configured (no path
//! normalisation), and the requested argument list must equal one approved
//! sequence element-for-element. Prefixes, supersets and reorderings of an
//! approved sequence are not approved.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{PolicyError, PolicyResult};

/// Allowlist shape as written in configuration.
pub type ArgumentSequences = BTreeMap<String, Vec<Vec<String>>>;

/// Outcome of an allowlist lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMatch {
    /// Executable is listed and the argument sequence is approved for it.
    Approved,
    /// Executable is not a key in the allowlist.
    UnknownExecutable,
    /// Executable is listed but the argument sequence is not.
    UnapprovedArguments,
}

impl CommandMatch {
    #[must_use]
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Compiled, immutable command allowlist.
#[derive(Debug, Clone, Default)]
pub struct AllowlistPolicy {
    entries: HashMap<String, HashSet<Vec<String>>>,
}

impl AllowlistPolicy {
    /// Compile the configured mapping, rejecting malformed entries.
    pub fn compile(table: &ArgumentSequences) -> PolicyResult<Self> {
        let mut entries = HashMap::with_capacity(table.len());

        for (executable, sequences) in table {
            validate_executable(executable)?;

            if sequences.is_empty() {
                return Err(invalid(executable, "no approved argument sequences"));
            }

            let mut approved = HashSet::with_capacity(sequences.len());
            for sequence in sequences {
                if let Some(arg) = sequence.iter().find(|a| a.contains('\0')) {
                    return Err(invalid(
                        executable,
                        &format!("argument {arg:?} contains a NUL byte"),
                    ));
                }
                approved.insert(sequence.clone());
            }

            entries.insert(executable.clone(), approved);
        }

        Ok(Self { entries })
    }

    /// Look up an executable and its full argument list.
    #[must_use]
    pub fn check(&self, executable: &str, arguments: &[String]) -> CommandMatch {
        match self.entries.get(executable) {
            None => CommandMatch::UnknownExecutable,
            Some(approved) if approved.contains(arguments) => CommandMatch::Approved,
            Some(_) => CommandMatch::UnapprovedArguments,
        }
    }

    /// Number of listed executables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted view of the compiled policy, for display.
    #[must_use]
    pub fn to_sequences(&self) -> ArgumentSequences {
        self.entries
            .iter()
            .map(|(executable, approved)| {
                let mut sequences: Vec<Vec<String>> = approved.iter().cloned().collect();
                sequences.sort();
                (executable.clone(), sequences)
            })
            .collect()
    }
}

fn validate_executable(executable: &str) -> PolicyResult<()> {
    if executable.is_empty() {
        return Err(invalid(executable, "executable path is empty"));
    }
    if executable.trim() != executable {
        return Err(invalid(
            executable,
            "executable path has leading or trailing whitespace",
        ));
    }
    if executable.contains('\0') {
        return Err(invalid(executable, "executable path contains a NUL byte"));
    }
    Ok(())
}

fn invalid(executable: &str, reason: &str) -> PolicyError {
    PolicyError::InvalidAllowlist {
        executable: executable.to_string(),
        reason: reason.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn policy(yaml: &str) -> AllowlistPolicy {
        let table: ArgumentSequences = serde_yaml::from_str(yaml).unwrap();
        AllowlistPolicy::compile(&table).unwrap()
    }

    #[test]
    fn test_exact_sequence_approved() {
        let p = policy(r#"sh: [["-c"], ["-s"]]"#);
        assert_eq!(p.check("sh", &args(&["-c"])), CommandMatch::Approved);
        assert_eq!(p.check("sh", &args(&["-s"])), CommandMatch::Approved);
    }

    #[test]
    fn test_combined_single_flags_denied() {
        let p = policy(r#"sh: [["-c"], ["-s"]]"#);
        assert_eq!(
            p.check("sh", &args(&["-c", "-s"])),
            CommandMatch::UnapprovedArguments
        );
    }

    #[test]
    fn test_unknown_executable_denied_even_with_matching_args() {
        let p = policy(r#"sh: [["-c"]]"#);
        assert_eq!(
            p.check("bash", &args(&["-c"])),
            CommandMatch::UnknownExecutable
        );
    }

    #[test]
    fn test_executable_key_is_case_sensitive() {
        let p = policy(
            r#"'C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe': [["-command", "-"]]"#,
        );
        assert!(p
            .check(
                r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe",
                &args(&["-command", "-"])
            )
            .is_approved());
        assert_eq!(
            p.check(
                r"c:\windows\system32\windowspowershell\v1.0\powershell.exe",
                &args(&["-command", "-"])
            ),
            CommandMatch::UnknownExecutable
        );
    }

    #[test]
    fn test_empty_sequence_only_matches_no_arguments() {
        let p = policy(r#"uptime: [[]]"#);
        assert!(p.check("uptime", &[]).is_approved());
        assert!(!p.check("uptime", &args(&["-p"])).is_approved());
    }

    #[test]
    fn test_compile_rejects_malformed_entries() {
        let mut table = ArgumentSequences::new();
        table.insert(String::new(), vec![vec![]]);
        assert!(matches!(
            AllowlistPolicy::compile(&table),
            Err(PolicyError::InvalidAllowlist { .. })
        ));

        let mut table = ArgumentSequences::new();
        table.insert(" sh".to_string(), vec![vec![]]);
        assert!(AllowlistPolicy::compile(&table).is_err());

        let mut table = ArgumentSequences::new();
        table.insert("sh".to_string(), vec![]);
        let err = AllowlistPolicy::compile(&table).unwrap_err();
        assert!(err.to_string().contains("no approved argument sequences"));

        let mut table = ArgumentSequences::new();
        table.insert("sh".to_string(), vec![vec!["-c\0".to_string()]]);
        assert!(AllowlistPolicy::compile(&table).is_err());
    }

    #[test]
    fn test_to_sequences_is_sorted_and_deduplicated() {
        let p = policy(r#"sh: [["-s"], ["-c"], ["-c"]]"#);
        let view = p.to_sequences();
        assert_eq!(view["sh"], vec![args(&["-c"]), args(&["-s"])]);
        assert_eq!(p.len(), 1);
    }

    fn arg_strategy() -> impl Strategy<Value = String> {
        "[a-z-]{1,6}"
    }

    proptest! {
        #[test]
        fn test_only_exact_sequences_match(
            approved in prop::collection::vec(arg_strategy(), 1..5),
            extra in arg_strategy(),
        ) {
            let mut table = ArgumentSequences::new();
            table.insert("tool".to_string(), vec![approved.clone()]);
            let p = AllowlistPolicy::compile(&table).unwrap();

            prop_assert!(p.check("tool", &approved).is_approved());

            // Proper prefix
            let prefix = &approved[..approved.len() - 1];
            prop_assert!(!p.check("tool", prefix).is_approved());

            // Proper superset
            let mut superset = approved.clone();
            superset.push(extra);
            prop_assert!(!p.check("tool", &superset).is_approved());

            // Permutation (only differs when the sequence is not a palindrome)
            let mut reversed = approved.clone();
            reversed.reverse();
            if reversed != approved {
                prop_assert!(!p.check("tool", &reversed).is_approved());
            }
        }
    }
}
