//! Builders for the git command strings handed to the shell.

pub fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./@%+=:,".contains(c));
    if safe {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub fn status() -> String {
    "git status".to_string()
}

pub fn create_branch(branch: &str) -> String {
    format!("git checkout -b {}", quote(branch))
}

pub fn checkout(branch: &str) -> String {
    format!("git checkout {}", quote(branch))
}

pub fn add(paths: &[String]) -> String {
    let quoted: Vec<String> = paths.iter().map(|p| quote(p)).collect();
    format!("git add -- {}", quoted.join(" "))
}

/// Exits non-zero when the index differs from HEAD.
pub fn staged_changes_check() -> String {
    "git diff --cached --quiet".to_string()
}

pub fn commit(message: &str) -> String {
    format!("git commit -m {}", quote(message))
}

pub fn log_oneline(count: usize) -> String {
    format!("git log --oneline -{}", count)
}

pub fn push_hint(remote: &str, branch: &str) -> String {
    format!("git push -u {} {}", quote(remote), quote(branch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_leaves_plain_words() {
        assert_eq!(quote("initialize.sh"), "initialize.sh");
        assert_eq!(
            quote("fix/automation-framework-compatibility"),
            "fix/automation-framework-compatibility"
        );
        assert_eq!(quote(".bash_profile.dir/"), ".bash_profile.dir/");
    }

    #[test]
    fn quote_wraps_spaces_and_newlines() {
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("a\nb"), "'a\nb'");
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn quote_empty_string() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn commit_message_is_quoted() {
        assert_eq!(
            commit("feat: add \"yes\" flag"),
            "git commit -m 'feat: add \"yes\" flag'"
        );
    }

    #[test]
    fn add_joins_paths() {
        let paths = vec!["CLAUDE.md".to_string(), "my file".to_string()];
        assert_eq!(add(&paths), "git add -- CLAUDE.md 'my file'");
    }

    #[test]
    fn add_separates_dash_paths_from_options() {
        let paths = vec!["-notes.txt".to_string(), "--all".to_string()];
        assert_eq!(add(&paths), "git add -- -notes.txt --all");
    }

    #[test]
    fn branch_commands() {
        assert_eq!(create_branch("fix/x"), "git checkout -b fix/x");
        assert_eq!(checkout("fix/x"), "git checkout fix/x");
        assert_eq!(log_oneline(10), "git log --oneline -10");
        assert_eq!(push_hint("origin", "fix/x"), "git push -u origin fix/x");
    }

    #[cfg(unix)]
    #[test]
    fn quoted_message_survives_the_shell() {
        use crate::runner::{CommandRunner, Progress, ShellRunner};

        let tmp = tempfile::tempdir().unwrap();
        let message = "fix: it's \"quoted\"\n\n- $HOME stays literal";
        let result = ShellRunner::new(Progress::Quiet)
            .run(&format!("printf %s {}", quote(message)), tmp.path())
            .unwrap();
        assert_eq!(result.stdout, message);
    }
}
