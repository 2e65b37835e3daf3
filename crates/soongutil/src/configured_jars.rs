// soong: The module graph engine of the Android platform build.
// Copyright (C) 2024 International Digital Economy Academy
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// For inquiries, you can contact us via e-mail at jichuruanjian@idea.edu.cn.

//! Product-configured lists of `(apex, jar)` pairs, such as the boot jars.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfiguredJarError {
    #[error("malformed (apex, jar) pair: '{0}', expected format: <apex>:<jar>")]
    MalformedPair(String),

    #[error("invalid apex '{apex}' in <apex>:<jar> pair '{pair}', expected format: <apex>:<jar>")]
    InvalidApex { apex: String, pair: String },

    #[error(
        "malformed location override '{0}', expected format: <old_apex>:<old_jar>:<new_apex>:<new_jar>"
    )]
    MalformedOverride(String),
}

/// Splits `apex:jar` at the first colon.
pub fn split_apex_jar_pair(s: &str) -> Result<(&str, &str), ConfiguredJarError> {
    match s.split_once(':') {
        Some(("", _)) => Err(ConfiguredJarError::InvalidApex {
            apex: String::new(),
            pair: s.to_string(),
        }),
        Some(pair) => Ok(pair),
        None => Err(ConfiguredJarError::MalformedPair(s.to_string())),
    }
}

/// Two parallel lists, `apexes[i]` being the apex that contains `jars[i]`.
///
/// Every operation that changes the list returns a new value; nothing is
/// ever shared between two lists.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfiguredJarList {
    apexes: Vec<String>,
    jars: Vec<String>,
}

impl ConfiguredJarList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a list of `apex:jar` strings.
    pub fn parse<S: AsRef<str>>(list: &[S]) -> Result<Self, ConfiguredJarError> {
        let mut res = Self::default();
        for item in list {
            let (apex, jar) = split_apex_jar_pair(item.as_ref())?;
            res.apexes.push(apex.to_string());
            res.jars.push(jar.to_string());
        }
        Ok(res)
    }

    pub fn len(&self) -> usize {
        self.jars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jars.is_empty()
    }

    pub fn apex(&self, index: usize) -> &str {
        &self.apexes[index]
    }

    pub fn jar(&self, index: usize) -> &str {
        &self.jars[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.apexes
            .iter()
            .zip(self.jars.iter())
            .map(|(a, j)| (a.as_str(), j.as_str()))
    }

    pub fn contains_jar(&self, jar: &str) -> bool {
        self.jars.iter().any(|j| j == jar)
    }

    pub fn contains_apex_jar_pair(&self, apex: &str, jar: &str) -> bool {
        self.iter().any(|(a, j)| a == apex && j == jar)
    }

    pub fn index_of_jar(&self, jar: &str) -> Option<usize> {
        self.jars.iter().position(|j| j == jar)
    }

    pub fn apex_of_jar(&self, jar: &str) -> Option<&str> {
        self.index_of_jar(jar).map(|i| self.apex(i))
    }

    pub fn append(&self, apex: &str, jar: &str) -> Self {
        let mut res = self.clone();
        res.apexes.push(apex.to_string());
        res.jars.push(jar.to_string());
        res
    }

    pub fn append_list(&self, other: &ConfiguredJarList) -> Self {
        let mut res = self.clone();
        res.apexes.extend(other.apexes.iter().cloned());
        res.jars.extend(other.jars.iter().cloned());
        res
    }

    /// Returns a copy without the pairs that appear in `other`.
    pub fn remove_list(&self, other: &ConfiguredJarList) -> Self {
        self.retain(|apex, jar| !other.contains_apex_jar_pair(apex, jar))
    }

    /// Returns a copy keeping only the pairs whose jar is in `jars`.
    pub fn filter<S: AsRef<str>>(&self, jars: &[S]) -> Self {
        self.retain(|_, jar| jars.iter().any(|j| j.as_ref() == jar))
    }

    fn retain(&self, keep: impl Fn(&str, &str) -> bool) -> Self {
        let mut res = Self::default();
        for (apex, jar) in self.iter() {
            if keep(apex, jar) {
                res.apexes.push(apex.to_string());
                res.jars.push(jar.to_string());
            }
        }
        res
    }

    pub fn copy_of_jars(&self) -> Vec<String> {
        self.jars.clone()
    }

    pub fn copy_of_apex_jar_pairs(&self) -> Vec<String> {
        self.iter().map(|(a, j)| format!("{a}:{j}")).collect()
    }

    /// On-device locations of the jars.
    pub fn device_paths(&self) -> Vec<String> {
        self.iter()
            .map(|(apex, jar)| match apex {
                "platform" => format!("/system/framework/{jar}.jar"),
                "system_ext" => format!("/system_ext/framework/{jar}.jar"),
                _ => format!("/apex/{apex}/javalib/{jar}.jar"),
            })
            .collect()
    }

    /// Applies `old_apex:old_jar:new_apex:new_jar` relocations.
    pub fn apply_location_overrides<S: AsRef<str>>(
        &self,
        overrides: &[S],
    ) -> Result<Self, ConfiguredJarError> {
        let mut res = self.clone();
        for o in overrides {
            let o = o.as_ref();
            let parts: Vec<&str> = o.split(':').collect();
            let [old_apex, old_jar, new_apex, new_jar] = parts.as_slice() else {
                return Err(ConfiguredJarError::MalformedOverride(o.to_string()));
            };
            for i in 0..res.len() {
                if res.apexes[i] == *old_apex && res.jars[i] == *old_jar {
                    res.apexes[i] = new_apex.to_string();
                    res.jars[i] = new_jar.to_string();
                }
            }
        }
        Ok(res)
    }
}

impl fmt::Display for ConfiguredJarList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.copy_of_apex_jar_pairs().join(","))
    }
}

impl fmt::Debug for ConfiguredJarList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfiguredJarList[{self}]")
    }
}

impl FromStr for ConfiguredJarList {
    type Err = ConfiguredJarError;

    /// Parses a comma separated list of `apex:jar` pairs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let items: Vec<&str> = s.split(',').collect();
        Self::parse(&items)
    }
}

impl Serialize for ConfiguredJarList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.copy_of_apex_jar_pairs().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfiguredJarList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let list = Vec::<String>::deserialize(deserializer)?;
        Self::parse(&list).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use expect_test::expect;
    use test_log::test;

    #[test]
    fn round_trip_through_string() {
        let l: ConfiguredJarList = "platform:framework".parse().unwrap();
        assert_eq!(l.len(), 1);
        assert_eq!(l.apex(0), "platform");
        assert_eq!(l.jar(0), "framework");
        assert_eq!(l.to_string(), "platform:framework");
    }

    #[test]
    fn malformed_pairs() {
        let err = ConfiguredJarList::parse(&["noColon"]).unwrap_err();
        expect!["malformed (apex, jar) pair: 'noColon', expected format: <apex>:<jar>"]
            .assert_eq(&err.to_string());
        let err = ConfiguredJarList::parse(&[":jar"]).unwrap_err();
        expect!["invalid apex '' in <apex>:<jar> pair ':jar', expected format: <apex>:<jar>"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn mutation_returns_independent_values() {
        let base = ConfiguredJarList::parse(&["a:x", "b:y"]).unwrap();
        let appended = base.append("c", "z");
        assert_eq!(base.len(), 2);
        assert_eq!(appended.len(), 3);

        let other = base.append("d", "w");
        assert_eq!(appended.to_string(), "a:x,b:y,c:z");
        assert_eq!(other.to_string(), "a:x,b:y,d:w");

        let removed = appended.remove_list(&ConfiguredJarList::parse(&["b:y"]).unwrap());
        assert_eq!(removed.to_string(), "a:x,c:z");
        assert_eq!(appended.len(), 3);

        let filtered = appended.filter(&["z", "x"]);
        assert_eq!(filtered.to_string(), "a:x,c:z");
    }

    #[test]
    fn device_paths() {
        let l = ConfiguredJarList::parse(&["platform:a", "system_ext:b", "com.android.art:c"])
            .unwrap();
        expect![[r#"
            [
                "/system/framework/a.jar",
                "/system_ext/framework/b.jar",
                "/apex/com.android.art/javalib/c.jar",
            ]
        "#]]
        .assert_debug_eq(&l.device_paths());
    }

    #[test]
    fn location_overrides() {
        let l = ConfiguredJarList::parse(&["platform:a", "platform:b"]).unwrap();
        let moved = l
            .apply_location_overrides(&["platform:b:com.android.b:b2"])
            .unwrap();
        assert_eq!(moved.to_string(), "platform:a,com.android.b:b2");
        assert!(l.apply_location_overrides(&["platform:b"]).is_err());
    }

    #[test]
    fn json() {
        let l: ConfiguredJarList =
            serde_json::from_str(r#"["platform:framework", "com.android.art:core-oj"]"#).unwrap();
        assert_eq!(l.apex_of_jar("core-oj"), Some("com.android.art"));
        assert_eq!(
            serde_json::to_string(&l).unwrap(),
            r#"["platform:framework","com.android.art:core-oj"]"#
        );
        assert!(serde_json::from_str::<ConfiguredJarList>(r#"["bad"]"#).is_err());
    }
}
