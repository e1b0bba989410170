//! Defines helper methods for Deserializing external types.
use std::str::FromStr;

use log::LevelFilter;
use serde::{de, Deserialize, Deserializer};

//------------ LevelFilter ---------------------------------------------------

pub fn de_level_filter<'de, D>(d: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let string = String::deserialize(d)?;
    LevelFilter::from_str(&string).map_err(de::Error::custom)
}
