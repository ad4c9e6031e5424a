use std::path::Path;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum ConfigError {
    #[error("config file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config file is corrupt: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// Settings persisted as toml next to the data they describe. The path handed in is a base
/// name; the extension is always [ConfigFile::file_ext].
pub trait ConfigFile: Serialize + DeserializeOwned {
    fn file_ext() -> String;

    fn to_file(&self,filename:&Path) -> Result<(),ConfigError> {
        let t = toml::to_string_pretty(&self)?;
        utils::write_to_file(filename,&Self::file_ext(),&t)?;
        Ok(())
    }

    fn from_file(filename:&Path) -> Result<Self,ConfigError> {
        let t = utils::read_to_string(filename,&Self::file_ext())?;
        Ok(toml::from_str(&t)?)
    }
}
