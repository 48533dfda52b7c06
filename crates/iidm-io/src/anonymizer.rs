//! Reversible identifier anonymization
//!
//! [`Anonymizer::Passthrough`] leaves every value untouched. [`Anonymizer::Simple`] replaces
//! each distinct string by a token (`A`, `B`, ..., `Z`, `AA`, ...) assigned on first use and
//! each distinct country by another country code, so anonymized documents stay valid.
//!
//! The mapping is persisted as a headerless CSV side file: `token,value` records for
//! strings, then a `[countries]` marker record, then `token,value` records for countries.

use std::collections::HashMap;
use std::io::{Read, Write};

use iidm_core::country::COUNTRY_CODES;
use iidm_core::{IidmError, IidmResult};

const COUNTRIES_MARKER: &str = "[countries]";

fn csv_error(err: csv::Error) -> IidmError {
    IidmError::Parse(format!("anonymization mapping: {err}"))
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`
fn token(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Bidirectional value/token table with tokens in assignment order.
#[derive(Debug, Default, Clone)]
struct Mapping {
    forward: HashMap<String, String>,
    backward: HashMap<String, String>,
    order: Vec<String>,
}

impl Mapping {
    fn insert(&mut self, value: &str, token: String) {
        self.forward.insert(value.to_string(), token.clone());
        self.backward.insert(token.clone(), value.to_string());
        self.order.push(token);
    }

    fn records(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|t| self.backward.get(t).map(|v| (t.as_str(), v.as_str())))
    }
}

#[derive(Debug, Default, Clone)]
pub struct SimpleAnonymizer {
    strings: Mapping,
    countries: Mapping,
}

impl SimpleAnonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymize(&mut self, value: &str) -> String {
        if let Some(token) = self.strings.forward.get(value) {
            return token.clone();
        }
        let token = token(self.strings.order.len());
        self.strings.insert(value, token.clone());
        token
    }

    pub fn deanonymize(&self, token: &str) -> IidmResult<String> {
        self.strings
            .backward
            .get(token)
            .cloned()
            .ok_or_else(|| IidmError::UnmappedToken(token.to_string()))
    }

    pub fn anonymize_country(&mut self, code: &str) -> IidmResult<String> {
        if let Some(token) = self.countries.forward.get(code) {
            return Ok(token.clone());
        }
        let token = COUNTRY_CODES
            .get(self.countries.order.len())
            .ok_or_else(|| IidmError::Other("no country code left for anonymization".into()))?
            .to_string();
        self.countries.insert(code, token.clone());
        Ok(token)
    }

    pub fn deanonymize_country(&self, token: &str) -> IidmResult<String> {
        self.countries
            .backward
            .get(token)
            .cloned()
            .ok_or_else(|| IidmError::UnmappedToken(token.to_string()))
    }

    pub fn len(&self) -> usize {
        self.strings.order.len() + self.countries.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_mapping<W: Write>(&self, out: W) -> IidmResult<()> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(out);
        for (token, value) in self.strings.records() {
            csv.write_record([token, value]).map_err(csv_error)?;
        }
        csv.write_record([COUNTRIES_MARKER]).map_err(csv_error)?;
        for (token, value) in self.countries.records() {
            csv.write_record([token, value]).map_err(csv_error)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn read_mapping<R: Read>(input: R) -> IidmResult<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);
        let mut anonymizer = SimpleAnonymizer::new();
        let mut in_countries = false;
        for record in csv.records() {
            let record = record.map_err(csv_error)?;
            match (record.get(0), record.get(1)) {
                (Some(COUNTRIES_MARKER), None) => in_countries = true,
                (Some(token), Some(value)) => {
                    let mapping = if in_countries {
                        &mut anonymizer.countries
                    } else {
                        &mut anonymizer.strings
                    };
                    mapping.insert(value, token.to_string());
                }
                _ => {
                    return Err(IidmError::Parse(format!(
                        "anonymization mapping: malformed record at line {}",
                        record.position().map_or(0, |p| p.line())
                    )))
                }
            }
        }
        Ok(anonymizer)
    }
}

/// Anonymization strategy of one document pass.
#[derive(Debug, Clone, Default)]
pub enum Anonymizer {
    #[default]
    Passthrough,
    Simple(SimpleAnonymizer),
}

impl Anonymizer {
    pub fn is_active(&self) -> bool {
        matches!(self, Anonymizer::Simple(_))
    }

    pub fn anonymize(&mut self, value: &str) -> String {
        match self {
            Anonymizer::Passthrough => value.to_string(),
            Anonymizer::Simple(simple) => simple.anonymize(value),
        }
    }

    pub fn deanonymize(&self, token: &str) -> IidmResult<String> {
        match self {
            Anonymizer::Passthrough => Ok(token.to_string()),
            Anonymizer::Simple(simple) => simple.deanonymize(token),
        }
    }

    pub fn anonymize_country(&mut self, code: &str) -> IidmResult<String> {
        match self {
            Anonymizer::Passthrough => Ok(code.to_string()),
            Anonymizer::Simple(simple) => simple.anonymize_country(code),
        }
    }

    pub fn deanonymize_country(&self, token: &str) -> IidmResult<String> {
        match self {
            Anonymizer::Passthrough => Ok(token.to_string()),
            Anonymizer::Simple(simple) => simple.deanonymize_country(token),
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleAnonymizer> {
        match self {
            Anonymizer::Simple(simple) => Some(simple),
            Anonymizer::Passthrough => None,
        }
    }
}
