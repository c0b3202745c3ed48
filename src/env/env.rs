// SPDX-License-Identifier: GPL-2.0-or-later

use common::SplitName;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Main run configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnvConf {
    subset: SplitName,
    data_dir: PathBuf,
    hoi_candidates: PathBuf,
    exp_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct RawEnvConf {
    subset: SplitName,
    data_dir: PathBuf,
    hoi_candidates: PathBuf,
    exp_dir: PathBuf,
}

impl EnvConf {
    pub fn new(config_path: &PathBuf) -> Result<EnvConf, EnvConfigNewError> {
        use EnvConfigNewError::*;
        let file_exist = config_path.exists();
        if !file_exist {
            print!(
                "\n\nGenerating '{}' and exiting..\n\n\n",
                config_path.to_string_lossy()
            );

            let cwd = std::env::current_dir().map_err(GetCwd)?;
            generate_config(config_path, &cwd)?;
            std::process::exit(0);
        }

        let env_toml = fs::read_to_string(config_path).map_err(ReadFile)?;
        let env = parse_config(&env_toml)?;

        Ok(env)
    }

    #[must_use]
    pub fn subset(&self) -> &SplitName {
        &self.subset
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Candidate container path base without file extension.
    #[must_use]
    pub fn hoi_candidates(&self) -> &Path {
        &self.hoi_candidates
    }

    #[must_use]
    pub fn exp_dir(&self) -> &Path {
        &self.exp_dir
    }

    #[must_use]
    pub fn anno_list(&self) -> PathBuf {
        self.data_dir.join("anno_list.json")
    }

    #[must_use]
    pub fn hoi_list(&self) -> PathBuf {
        self.data_dir.join("hoi_list.json")
    }

    #[must_use]
    pub fn split_ids(&self) -> PathBuf {
        self.data_dir.join("split_ids.json")
    }
}

#[derive(Debug, Error)]
pub enum EnvConfigNewError {
    #[error("read env config file: {0}")]
    ReadFile(std::io::Error),

    #[error("generate env config: {0}")]
    Generate(#[from] GenerateEnvConfigError),

    #[error("parse env config: {0}")]
    Parse(#[from] ParseEnvConfigError),

    #[error("get current working directory: {0}")]
    GetCwd(std::io::Error),
}

#[derive(Debug, Error)]
pub enum GenerateEnvConfigError {
    #[error("create file: {0}")]
    CreateFile(std::io::Error),

    #[error("templater error: {0}")]
    AddTemplate(upon::Error),

    #[error("render template: {0}")]
    RenderTemplate(upon::Error),

    #[error("get parent directory")]
    GetParentDir(),

    #[error("create directory: {0}")]
    CreateDir(std::io::Error),

    #[error("write file: {0}")]
    WriteFile(std::io::Error),
}

fn generate_config(path: &Path, cwd: &Path) -> Result<(), GenerateEnvConfigError> {
    use GenerateEnvConfigError::*;

    let data = HashMap::from([("cwd", cwd)]);

    let mut engine = upon::Engine::new();
    engine
        .add_template("config", CONFIG_TEMPLATE)
        .map_err(AddTemplate)?;

    let config = engine
        .get_template("config")
        .expect("template should just have been added")
        .render(data)
        .to_string()
        .map_err(RenderTemplate)?;

    let config_dir = path.parent().ok_or(GetParentDir())?;
    fs::create_dir_all(config_dir).map_err(CreateDir)?;

    let mut file = File::create(path).map_err(CreateFile)?;
    write!(file, "{config}").map_err(WriteFile)?;

    Ok(())
}

const CONFIG_TEMPLATE: &str = include_str!("./default_config.tpl");

#[derive(Debug, Error)]
pub enum ParseEnvConfigError {
    #[error("{0}")]
    DeserializeToml(#[from] toml::de::Error),

    #[error("{0} path is not absolute '{1}'")]
    PathNotAbsolute(String, PathBuf),

    #[error("create exp dir: {0} {1}")]
    CreateExpDir(PathBuf, std::io::Error),

    #[error("canonicalize path: {0:?} {1}")]
    Canonicalize(PathBuf, std::io::Error),
}

fn parse_config(env_toml: &str) -> Result<EnvConf, ParseEnvConfigError> {
    use ParseEnvConfigError::*;
    let raw: RawEnvConf = toml::from_str(env_toml)?;

    if !raw.data_dir.is_absolute() {
        return Err(PathNotAbsolute("data_dir".to_owned(), raw.data_dir));
    }
    if !raw.hoi_candidates.is_absolute() {
        return Err(PathNotAbsolute(
            "hoi_candidates".to_owned(),
            raw.hoi_candidates,
        ));
    }
    if !raw.exp_dir.is_absolute() {
        return Err(PathNotAbsolute("exp_dir".to_owned(), raw.exp_dir));
    }

    let data_dir = raw
        .data_dir
        .canonicalize()
        .map_err(|e| Canonicalize(raw.data_dir, e))?;

    std::fs::create_dir_all(&raw.exp_dir).map_err(|e| CreateExpDir(raw.exp_dir.clone(), e))?;
    let exp_dir = raw
        .exp_dir
        .canonicalize()
        .map_err(|e| Canonicalize(raw.exp_dir, e))?;

    Ok(EnvConf {
        subset: raw.subset,
        data_dir,
        hoi_candidates: raw.hoi_candidates,
        exp_dir,
    })
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("data")).unwrap();
        let config_file = temp_dir.path().join("configs").join("hoilabel.toml");

        generate_config(&config_file, temp_dir.path()).unwrap();
        EnvConf::new(&config_file).unwrap();
    }
    #[test]
    fn test_parse_config_ok() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let exp_dir = temp_dir.path().join("exp");
        std::fs::create_dir(&data_dir).unwrap();
        let data_dir = data_dir.to_str().unwrap();
        let exp_dir = exp_dir.to_str().unwrap();

        let config = format!(
            "
            subset = \"train\"
            data_dir = \"{data_dir}\"
            hoi_candidates = \"{data_dir}/hoi_candidates_train\"
            exp_dir = \"{exp_dir}\"
        ",
        );

        let data_dir: PathBuf = data_dir.parse().unwrap();
        let want = EnvConf {
            subset: "train".parse().unwrap(),
            data_dir: data_dir.clone(),
            hoi_candidates: data_dir.join("hoi_candidates_train"),
            exp_dir: exp_dir.parse().unwrap(),
        };
        let got = parse_config(&config).unwrap();
        assert_eq!(want, got);
        assert_eq!(data_dir.join("anno_list.json"), got.anno_list());
        assert_eq!(data_dir.join("hoi_list.json"), got.hoi_list());
        assert_eq!(data_dir.join("split_ids.json"), got.split_ids());
    }
    #[test]
    fn test_parse_config_creates_exp_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        let exp_dir = temp_dir.path().join("exp").join("run1");
        std::fs::create_dir(&data_dir).unwrap();

        let config = format!(
            "
            subset = \"test\"
            data_dir = \"{}\"
            hoi_candidates = \"{}/hoi_candidates_test\"
            exp_dir = \"{}\"
        ",
            data_dir.to_str().unwrap(),
            data_dir.to_str().unwrap(),
            exp_dir.to_str().unwrap(),
        );

        parse_config(&config).unwrap();
        assert!(exp_dir.is_dir());
    }
    #[test]
    fn test_parse_config_deserialize_error() {
        assert!(matches!(
            parse_config("&"),
            Err(ParseEnvConfigError::DeserializeToml(_)),
        ));
    }
    #[test]
    fn test_parse_config_data_dir_abs_error() {
        let config = "
            subset = \"train\"
            data_dir = \".\"
            hoi_candidates = \"/ok\"
            exp_dir = \"/ok\"
        ";

        assert!(matches!(
            parse_config(config),
            Err(ParseEnvConfigError::PathNotAbsolute(..))
        ));
    }
    #[test]
    fn test_parse_config_hoi_candidates_abs_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = format!(
            "
            subset = \"train\"
            data_dir = \"{}\"
            hoi_candidates = \".\"
            exp_dir = \"/ok\"
        ",
            temp_dir.path().to_str().unwrap(),
        );

        assert!(matches!(
            parse_config(&config),
            Err(ParseEnvConfigError::PathNotAbsolute(..))
        ));
    }
    #[test]
    fn test_parse_config_exp_dir_abs_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = format!(
            "
            subset = \"train\"
            data_dir = \"{}\"
            hoi_candidates = \"/ok\"
            exp_dir = \".\"
        ",
            temp_dir.path().to_str().unwrap(),
        );

        assert!(matches!(
            parse_config(&config),
            Err(ParseEnvConfigError::PathNotAbsolute(..))
        ));
    }
}
