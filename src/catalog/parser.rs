use crate::catalog::{CatalogLayout, CodeBookEntry, CodeCatalog, LineRange, PlaceholderPolicy};
use crate::error::{PipelineError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

// `   582 =  'MEXICO Air Sea, and Not Reported (I-94, no land arrivals)'`
static COUNTRY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*'?(-?\d+)'?\s*=\s*'(.*)'\s*;?\s*$").expect("valid country regex")
});

// `	'ANC'	=	'ANCHORAGE, AK             '`
static PORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*'([^']*)'\s*=\s*'(.*)'\s*;?\s*$").expect("valid port regex")
});

static PLACEHOLDER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(unknown|not reported|no port code|no country code|invalid|collapsed|unidentifi?ed)",
    )
    .expect("valid placeholder regex")
});

/// Returns true when a label stands in for "no real value".
pub fn is_placeholder_label(label: &str) -> bool {
    PLACEHOLDER_LABEL.is_match(label)
}

/// Parses the I-94 code book into country and port tables.
#[derive(Debug, Clone, Default)]
pub struct CatalogParser {
    layout: CatalogLayout,
    placeholder_policy: PlaceholderPolicy,
}

impl CatalogParser {
    pub fn new(layout: CatalogLayout, placeholder_policy: PlaceholderPolicy) -> Self {
        Self {
            layout,
            placeholder_policy,
        }
    }

    pub fn parse_file(&self, path: &Path) -> Result<CodeCatalog> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        self.parse(&text)
    }

    pub fn parse(&self, text: &str) -> Result<CodeCatalog> {
        let lines: Vec<&str> = text.lines().collect();

        let countries = self
            .section(&lines, self.layout.countries, "country")?
            .into_iter()
            .map(|(line_no, line)| parse_country_line(line_no, line))
            .collect::<Result<Vec<_>>>()?;

        let ports = self
            .section(&lines, self.layout.ports, "port")?
            .into_iter()
            .map(|(line_no, line)| parse_port_line(line_no, line))
            .collect::<Result<Vec<_>>>()?;

        let (countries, ports) = match self.placeholder_policy {
            PlaceholderPolicy::Retain => (countries, ports),
            PlaceholderPolicy::Exclude => (
                countries.into_iter().filter(|e| !e.placeholder).collect(),
                ports.into_iter().filter(|e| !e.placeholder).collect(),
            ),
        };

        let catalog = CodeCatalog::from_entries(countries, ports);
        info!(
            "Parsed code book: {} countries, {} ports ({} placeholder entries, policy {:?})",
            catalog.country_count(),
            catalog.port_count(),
            catalog.placeholder_count(),
            self.placeholder_policy
        );

        Ok(catalog)
    }

    fn section<'a>(
        &self,
        lines: &[&'a str],
        range: LineRange,
        name: &str,
    ) -> Result<Vec<(usize, &'a str)>> {
        if range.is_empty() {
            return Err(PipelineError::catalog(format!(
                "{} line range {}..={} is empty",
                name, range.start, range.end
            )));
        }
        if range.end >= lines.len() {
            return Err(PipelineError::catalog(format!(
                "{} line range {}..={} is absent: code book has only {} lines",
                name,
                range.start,
                range.end,
                lines.len()
            )));
        }

        debug!("Reading {} entries from lines {}..={}", name, range.start, range.end);
        Ok((range.start..=range.end).map(|i| (i, lines[i])).collect())
    }
}

fn parse_country_line(line_no: usize, line: &str) -> Result<CodeBookEntry<i64>> {
    let captures = COUNTRY_LINE.captures(line).ok_or_else(|| {
        PipelineError::catalog(format!(
            "line {} is not a country entry: {:?}",
            line_no, line
        ))
    })?;

    let code = captures[1].parse::<i64>().map_err(|e| {
        PipelineError::catalog(format!(
            "line {} has an invalid country code {:?}: {}",
            line_no, &captures[1], e
        ))
    })?;
    let label = captures[2].trim().to_string();

    Ok(CodeBookEntry {
        code,
        placeholder: is_placeholder_label(&label),
        label,
    })
}

fn parse_port_line(line_no: usize, line: &str) -> Result<CodeBookEntry<String>> {
    let captures = PORT_LINE.captures(line).ok_or_else(|| {
        PipelineError::catalog(format!("line {} is not a port entry: {:?}", line_no, line))
    })?;

    let code = captures[1].trim().to_string();
    if code.is_empty() {
        return Err(PipelineError::catalog(format!(
            "line {} has an empty port code",
            line_no
        )));
    }
    let label = captures[2].trim().to_string();

    Ok(CodeBookEntry {
        code,
        placeholder: is_placeholder_label(&label),
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE_BOOK: &str = "\
/* I94RES - country codes */
value i94cntyl
   117 =  'ECUADOR'
   582 =  'MEXICO Air Sea, and Not Reported (I-94, no land arrivals)'
   236 =  'AFGHANISTAN'
   400 =  'INVALID: ANTARCTICA'
;
/* I94PORT */
value $i94prtl
\t'ANC'\t=\t'ANCHORAGE, AK             '
\t'NYC'\t=\t'NEW YORK, NY              '
\t'XXX'\t=\t'NOT REPORTED/UNKNOWN      '
";

    fn layout() -> CatalogLayout {
        CatalogLayout {
            countries: LineRange::new(2, 5),
            ports: LineRange::new(9, 11),
        }
    }

    #[test]
    fn test_parse_code_book() {
        let catalog = CatalogParser::new(layout(), PlaceholderPolicy::Retain)
            .parse(CODE_BOOK)
            .unwrap();

        assert_eq!(catalog.country_count(), 4);
        assert_eq!(catalog.country_name(117), Some("ECUADOR"));
        assert_eq!(
            catalog.country_name(582),
            Some("MEXICO Air Sea, and Not Reported (I-94, no land arrivals)")
        );
        assert_eq!(catalog.port_count(), 3);
        assert_eq!(catalog.port_name("ANC"), Some("ANCHORAGE, AK"));
        assert_eq!(catalog.port_name("XXX"), Some("NOT REPORTED/UNKNOWN"));
    }

    #[test]
    fn test_placeholders_are_flagged_and_retained() {
        let catalog = CatalogParser::new(layout(), PlaceholderPolicy::Retain)
            .parse(CODE_BOOK)
            .unwrap();

        let flagged: Vec<&str> = catalog
            .ports()
            .iter()
            .filter(|p| p.placeholder)
            .map(|p| p.code.as_str())
            .collect();
        assert_eq!(flagged, vec!["XXX"]);
        assert!(catalog.contains_port("XXX"));
        // 582 is Mexico; only a leading marker counts
        assert_eq!(catalog.placeholder_count(), 2);
    }

    #[test]
    fn test_placeholders_can_be_excluded() {
        let catalog = CatalogParser::new(layout(), PlaceholderPolicy::Exclude)
            .parse(CODE_BOOK)
            .unwrap();

        assert!(!catalog.contains_port("XXX"));
        assert_eq!(catalog.country_name(400), None);
        assert_eq!(catalog.country_name(117), Some("ECUADOR"));
    }

    #[test]
    fn test_missing_range_is_fatal() {
        let short = CatalogLayout {
            countries: LineRange::new(2, 5),
            ports: LineRange::new(8, 40),
        };
        let err = CatalogParser::new(short, PlaceholderPolicy::Retain)
            .parse(CODE_BOOK)
            .unwrap_err();
        assert!(matches!(err, PipelineError::CatalogFormat(_)));
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        // line 6 is the ';' terminator, not an entry
        let off_by_one = CatalogLayout {
            countries: LineRange::new(2, 6),
            ports: LineRange::new(9, 11),
        };
        let err = CatalogParser::new(off_by_one, PlaceholderPolicy::Retain)
            .parse(CODE_BOOK)
            .unwrap_err();
        assert!(err.to_string().contains("line 6"));
    }

    #[test]
    fn test_port_line_is_not_a_country_line() {
        assert!(parse_country_line(0, "\t'ANC'\t=\t'ANCHORAGE, AK'").is_err());
        assert!(parse_port_line(0, "   117 =  'ECUADOR'").is_err());
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder_label("NOT REPORTED/UNKNOWN"));
        assert!(is_placeholder_label("No PORT Code (ZZZ)"));
        assert!(is_placeholder_label("UNIDENTIFED AIR / SEAPORT"));
        assert!(!is_placeholder_label("ANCHORAGE, AK"));
        assert!(!is_placeholder_label(
            "MEXICO Air Sea, and Not Reported (I-94, no land arrivals)"
        ));
    }
}
