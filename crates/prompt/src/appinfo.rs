//! Desktop-entry lookup for prompt metadata: search `XDG_DATA_HOME`
//! then `XDG_DATA_DIRS` for `applications/<id>.desktop`, read `Name`
//! and `Icon`.

use std::fmt;
use std::path::{Path, PathBuf};

use tb_domain::{ApplicationId, AppInfo};

#[derive(Debug)]
pub enum AppInfoError {
    NotFound(String),
    MissingName,
    MissingIcon,
    IconNotAbsolute(PathBuf),
    IconNotRegularFile(PathBuf),
}

impl fmt::Display for AppInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppInfoError::NotFound(id) => write!(f, "no desktop entry found for {id}"),
            AppInfoError::MissingName => write!(f, "desktop entry has no Name"),
            AppInfoError::MissingIcon => write!(f, "desktop entry has no Icon"),
            AppInfoError::IconNotAbsolute(p) => {
                write!(f, "icon path {} is not absolute", p.display())
            }
            AppInfoError::IconNotRegularFile(p) => {
                write!(f, "icon path {} is not a regular file", p.display())
            }
        }
    }
}

impl std::error::Error for AppInfoError {}

/// Search directories, in priority order: `XDG_DATA_HOME` (or
/// `~/.local/share`) first, then each of `XDG_DATA_DIRS`.
fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(data_home) = dirs_data_home() {
        dirs.push(data_home);
    }
    if let Ok(data_dirs) = std::env::var("XDG_DATA_DIRS") {
        dirs.extend(std::env::split_paths(&data_dirs));
    } else {
        dirs.push(PathBuf::from("/usr/local/share"));
        dirs.push(PathBuf::from("/usr/share"));
    }
    dirs
}

fn dirs_data_home() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("XDG_DATA_HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    dirs::data_dir()
}

pub fn resolve_app_info(application_id: &ApplicationId) -> Result<AppInfo, AppInfoError> {
    let file_name = format!("{}.desktop", application_id.as_str());
    let entry_path = search_dirs()
        .into_iter()
        .map(|dir| dir.join("applications").join(&file_name))
        .find(|path| path.is_file())
        .ok_or_else(|| AppInfoError::NotFound(application_id.to_string()))?;

    parse_desktop_entry(&entry_path, application_id)
}

fn parse_desktop_entry(
    path: &Path,
    application_id: &ApplicationId,
) -> Result<AppInfo, AppInfoError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_| AppInfoError::NotFound(application_id.to_string()))?;

    let mut name: Option<String> = None;
    let mut icon: Option<String> = None;

    for line in contents.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Name=") {
            name.get_or_insert(value.to_owned());
        } else if let Some(value) = line.strip_prefix("Icon=") {
            icon.get_or_insert(value.to_owned());
        }
    }

    let localized_name = name.ok_or(AppInfoError::MissingName)?;
    let icon_path = PathBuf::from(icon.ok_or(AppInfoError::MissingIcon)?);

    if !icon_path.is_absolute() {
        return Err(AppInfoError::IconNotAbsolute(icon_path));
    }
    let metadata = std::fs::metadata(&icon_path)
        .map_err(|_| AppInfoError::IconNotRegularFile(icon_path.clone()))?;
    if !metadata.is_file() {
        return Err(AppInfoError::IconNotRegularFile(icon_path));
    }

    Ok(AppInfo {
        icon_path,
        localized_name,
        application_id: application_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_valid_entry() {
        let dir = tempfile::tempdir().unwrap();
        let apps_dir = dir.path().join("applications");
        std::fs::create_dir_all(&apps_dir).unwrap();

        let icon_path = dir.path().join("icon.png");
        std::fs::File::create(&icon_path).unwrap().write_all(b"x").unwrap();

        let entry_path = apps_dir.join("app.example.desktop");
        std::fs::write(
            &entry_path,
            format!("[Desktop Entry]\nName=Example\nIcon={}\n", icon_path.display()),
        )
        .unwrap();

        std::env::set_var("XDG_DATA_HOME", dir.path());
        let id: ApplicationId = "app.example".into();
        let info = resolve_app_info(&id).unwrap();
        assert_eq!(info.localized_name, "Example");
        assert_eq!(info.icon_path, icon_path);
        std::env::remove_var("XDG_DATA_HOME");
    }

    #[test]
    fn missing_entry_is_fatal() {
        std::env::set_var("XDG_DATA_HOME", "/nonexistent/path/for/test");
        let id: ApplicationId = "no.such.app".into();
        assert!(matches!(resolve_app_info(&id), Err(AppInfoError::NotFound(_))));
        std::env::remove_var("XDG_DATA_HOME");
    }

    #[test]
    fn relative_icon_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let apps_dir = dir.path().join("applications");
        std::fs::create_dir_all(&apps_dir).unwrap();
        std::fs::write(
            apps_dir.join("app.relicon.desktop"),
            "[Desktop Entry]\nName=Example\nIcon=icon.png\n",
        )
        .unwrap();

        std::env::set_var("XDG_DATA_HOME", dir.path());
        let id: ApplicationId = "app.relicon".into();
        assert!(matches!(resolve_app_info(&id), Err(AppInfoError::IconNotAbsolute(_))));
        std::env::remove_var("XDG_DATA_HOME");
    }
}
