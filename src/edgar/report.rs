use once_cell::sync::Lazy;
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// Form types the harvester knows by name. Anything else is carried verbatim
/// in `Other` and still matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter)]
pub enum FormType {
    Form10K,
    Form10KA,
    Form10Q,
    Form8K,
    Form8KA,
    Form20F,
    Form6K,
    FormDEF14A,
    FormS1,
    Other(String),
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormType::Form10K => write!(f, "10-K"),
            FormType::Form10KA => write!(f, "10-K/A"),
            FormType::Form10Q => write!(f, "10-Q"),
            FormType::Form8K => write!(f, "8-K"),
            FormType::Form8KA => write!(f, "8-K/A"),
            FormType::Form20F => write!(f, "20-F"),
            FormType::Form6K => write!(f, "6-K"),
            FormType::FormDEF14A => write!(f, "DEF 14A"),
            FormType::FormS1 => write!(f, "S-1"),
            FormType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static FORM_TYPES: Lazy<String> = Lazy::new(|| {
    FormType::iter()
        .filter(|t| !matches!(t, FormType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl FormType {
    pub fn list_types() -> &'static str {
        &FORM_TYPES
    }

    /// True when an index row's `Form Type` column names this form.
    pub fn matches(&self, form_type: &str) -> bool {
        form_type.trim().eq_ignore_ascii_case(&self.to_string())
    }

    /// Filesystem-friendly name, e.g. `DEF_14A` or `10-K_A`.
    pub fn file_stem(&self) -> String {
        self.to_string().replace([' ', '/'], "_")
    }
}

impl FromStr for FormType {
    type Err = String;

    fn from_str(s: &str) -> Result<FormType, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("form type must not be empty".to_string());
        }
        match trimmed.to_uppercase().as_str() {
            "10-K" => Ok(FormType::Form10K),
            "10-K/A" => Ok(FormType::Form10KA),
            "10-Q" => Ok(FormType::Form10Q),
            "8-K" => Ok(FormType::Form8K),
            "8-K/A" => Ok(FormType::Form8KA),
            "20-F" => Ok(FormType::Form20F),
            "6-K" => Ok(FormType::Form6K),
            "DEF 14A" => Ok(FormType::FormDEF14A),
            "S-1" => Ok(FormType::FormS1),
            _ => Ok(FormType::Other(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_insensitive() {
        let form = FormType::from_str("10-k").unwrap();
        assert_eq!(form, FormType::Form10K);
        assert!(form.matches("10-K"));
        assert!(form.matches(" 10-k "));
        assert!(!form.matches("10-K/A"));
        assert!(!form.matches("8-K"));
    }

    #[test]
    fn test_unknown_forms_are_kept_verbatim() {
        let form = FormType::from_str("NT 10-K").unwrap();
        assert_eq!(form, FormType::Other("NT 10-K".to_string()));
        assert!(form.matches("nt 10-k"));
        assert_eq!(form.file_stem(), "NT_10-K");
    }

    #[test]
    fn test_empty_form_is_rejected() {
        assert!(FormType::from_str("  ").is_err());
    }

    #[test]
    fn test_list_types_excludes_other() {
        let listed = FormType::list_types();
        assert!(listed.starts_with("10-K, 10-K/A"));
        assert!(listed.contains("DEF 14A"));
    }
}
