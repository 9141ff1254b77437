use std::env;
use std::path::PathBuf;

/// Get the home directory
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|bd| bd.home_dir().to_path_buf())
}

/// Expand a leading `~` and any `$VAR` / `${VAR}` references in `raw`.
///
/// Unset variables are left in place so the resulting path still points
/// somewhere recognisable in error messages.
pub fn expand(raw: &str) -> PathBuf {
    let expanded = shellexpand::full_with_context_no_errors(
        raw,
        || home_dir().map(|home| home.to_string_lossy().into_owned()),
        |name| env::var(name).ok(),
    );
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_expand_tilde() {
        let home = home_dir().unwrap();
        assert_eq!(expand("~/src/raid"), home.join("src/raid"));
        assert_eq!(expand("~"), home);
    }

    #[test]
    #[serial]
    fn test_expand_variables() {
        env::set_var("RAID_TEST_ROOT", "/opt/work");
        assert_eq!(expand("$RAID_TEST_ROOT/api"), PathBuf::from("/opt/work/api"));
        assert_eq!(expand("${RAID_TEST_ROOT}/web"), PathBuf::from("/opt/work/web"));
        env::remove_var("RAID_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn test_expand_unset_variable_is_kept() {
        env::remove_var("RAID_TEST_UNSET");
        assert_eq!(expand("/srv/$RAID_TEST_UNSET/app"), PathBuf::from("/srv/$RAID_TEST_UNSET/app"));
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(expand("/var/lib/repos"), PathBuf::from("/var/lib/repos"));
    }
}
