use std::str::FromStr;

use super::error::TypeError;

/// Raw `key=value` pairs as decoded from a query string. Keys may repeat.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value supplied for `key`, in request order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) if !value.is_empty() => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for '{key}'"))),
            _ => Ok(None),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.get_str(key) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                "" => Ok(None),
                _ => Err(TypeError::new(&format!("Invalid boolean for '{key}'"))),
            },
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_keys_are_collected() {
        let form = form(&[("tags", "lunch"), ("author", "3"), ("tags", "dinner")]);
        assert_eq!(form.get_all("tags"), vec!["lunch", "dinner"]);
        assert_eq!(form.get_number::<i32>("author").unwrap(), Some(3));
    }

    #[test]
    fn booleans_accept_numeric_and_words() {
        let form = form(&[("a", "1"), ("b", "False"), ("c", "maybe")]);
        assert_eq!(form.get_bool("a").unwrap(), Some(true));
        assert_eq!(form.get_bool("b").unwrap(), Some(false));
        assert!(form.get_bool("c").is_err());
        assert_eq!(form.get_bool("missing").unwrap(), None);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let form = form(&[("page", "two")]);
        assert!(form.get_number::<i64>("page").is_err());
    }
}
