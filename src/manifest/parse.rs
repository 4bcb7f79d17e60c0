use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::error::ManifestError;
use crate::model::Ecosystem;

/// Extracts dependency names from a manifest's raw text.
pub fn parse_dependencies(ecosystem: Ecosystem, text: &str) -> Result<Vec<String>, ManifestError> {
    match ecosystem {
        Ecosystem::Npm => parse_package_json(text),
        Ecosystem::Ruby => parse_gemfile(text),
        Ecosystem::Python => parse_requirements(text),
    }
}

/// Union of `dependencies` and `devDependencies` keys, in document order.
fn parse_package_json(text: &str) -> Result<Vec<String>, ManifestError> {
    let json: Value = serde_json::from_str(text)?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = json.get(section).and_then(Value::as_object) {
            for name in deps.keys() {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
        }
    }

    Ok(names)
}

fn parse_gemfile(text: &str) -> Result<Vec<String>, ManifestError> {
    let re = Regex::new(r#"gem ["']([^"']+)["']"#)?;

    Ok(re
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect())
}

fn parse_requirements(text: &str) -> Result<Vec<String>, ManifestError> {
    let re = Regex::new(r"^[a-zA-Z0-9._-]+")?;

    let mut seen = HashSet::new();
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && !line.starts_with("--")
                && !line.starts_with("git+")
                && !line.starts_with("-e")
        })
        .filter_map(|line| re.find(line).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_json_union_keeps_order() {
        let text = r#"{
            "name": "app",
            "dependencies": { "react": "^18", "left-pad": "1.0.0" },
            "devDependencies": { "jest": "^29", "react": "^18" }
        }"#;

        let names = parse_dependencies(Ecosystem::Npm, text).unwrap();
        assert_eq!(names, vec!["react", "left-pad", "jest"]);
    }

    #[test]
    fn test_package_json_without_dependencies() {
        let names = parse_dependencies(Ecosystem::Npm, r#"{ "name": "empty" }"#).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_package_json_invalid() {
        let result = parse_dependencies(Ecosystem::Npm, "{ not json");
        assert!(matches!(result, Err(ManifestError::Parse(_))));
    }

    #[test]
    fn test_gemfile_quotes() {
        let text = "source 'https://rubygems.org'\n\
                    gem 'rails', '~> 7.0'\n\
                    gem \"pg\"\n\
                    # gem 'commented'\n\
                    group :test do\n  gem 'rspec'\nend\n";

        let names = parse_dependencies(Ecosystem::Ruby, text).unwrap();
        // Commented-out declarations still match, like any plain text scan.
        assert_eq!(names, vec!["rails", "pg", "commented", "rspec"]);
    }

    #[test]
    fn test_requirements_filters_and_truncates() {
        let text = "\
# web
flask==2.3.0
requests>=2.0 ; python_version > '3'
--index-url https://example.org/simple
-e ./local
git+https://github.com/a/b.git
Django[argon2]~=4.2

flask
zope.interface
";
        let names = parse_dependencies(Ecosystem::Python, text).unwrap();
        assert_eq!(
            names,
            vec!["flask", "requests", "Django", "zope.interface"]
        );
    }

    #[test]
    fn test_requirements_skips_lines_without_name_token() {
        let names = parse_dependencies(Ecosystem::Python, "  \n>=1.0\n").unwrap();
        assert!(names.is_empty());
    }
}
