//! Listed-company directory loaded from the EDINET code list.
//!
//! The list is published as a Shift_JIS CSV whose first line is a banner; the
//! header row follows it. Only rows carrying a securities code are kept.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use valuation_core::{DataError, Result, SecuritiesCode, Ticker};

/// Securities code column.
const CODE_COLUMN: &str = "証券コード";
/// Industry column.
const INDUSTRY_COLUMN: &str = "提出者業種";
/// Company name column.
const NAME_COLUMN: &str = "提出者名";

/// One listed company.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Company {
    /// Filer name.
    pub name: String,
    /// Filer industry.
    pub industry: String,
    /// Statutory securities code, e.g. `72030`.
    pub securities_code: SecuritiesCode,
    /// Exchange ticker derived from the securities code, e.g. `7203.T`.
    pub ticker: Option<Ticker>,
}

impl Company {
    /// Creates an entry, deriving the ticker from `securities_code`.
    pub fn new(
        name: impl Into<String>,
        industry: impl Into<String>,
        securities_code: impl Into<String>,
    ) -> Self {
        let securities_code = SecuritiesCode::new(securities_code);
        let ticker = Ticker::from_securities_code(securities_code.as_str());
        Self {
            name: name.into(),
            industry: industry.into(),
            securities_code,
            ticker,
        }
    }
}

/// In-memory company list with the lookups the CLI needs.
#[derive(Clone, Debug, Default)]
pub struct CompanyDirectory {
    companies: Vec<Company>,
}

impl CompanyDirectory {
    /// Wraps an existing list.
    pub fn new(companies: Vec<Company>) -> Self {
        Self { companies }
    }

    /// Reads and decodes the code list at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| DataError::DataNotAvailable(format!("{}: {e}", path.display())))?;
        Self::from_shift_jis(&bytes)
    }

    /// Decodes a Shift_JIS code list, banner line included.
    pub fn from_shift_jis(bytes: &[u8]) -> Result<Self> {
        let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
        if had_errors {
            warn!("Company list contains malformed Shift_JIS sequences");
        }
        let body = text.split_once('\n').map_or("", |(_, rest)| rest);
        Self::from_csv(body)
    }

    /// Parses the CSV body (header row first, banner already removed).
    pub fn from_csv(body: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataError::MissingField(name.to_string()))
        };
        let code_idx = position(CODE_COLUMN)?;
        let industry_idx = position(INDUSTRY_COLUMN)?;
        let name_idx = position(NAME_COLUMN)?;

        let mut companies = Vec::new();
        let mut skipped = 0usize;
        for row in reader.records() {
            let row = row.map_err(|e| DataError::Parse(e.to_string()))?;
            let code = row.get(code_idx).unwrap_or_default().trim();
            if code.is_empty() {
                skipped += 1;
                continue;
            }
            companies.push(Company::new(
                row.get(name_idx).unwrap_or_default().trim(),
                row.get(industry_idx).unwrap_or_default().trim(),
                code,
            ));
        }

        debug!(
            companies = companies.len(),
            skipped, "Loaded company directory"
        );
        Ok(Self::new(companies))
    }

    /// Every entry in file order.
    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    /// Returns true if the directory holds no entries.
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Distinct industries, sorted.
    pub fn industries(&self) -> Vec<&str> {
        let mut industries: Vec<&str> = self
            .companies
            .iter()
            .map(|c| c.industry.as_str())
            .collect();
        industries.sort_unstable();
        industries.dedup();
        industries
    }

    /// Companies belonging to any of `industries`, sorted by name.
    pub fn in_industries<S: AsRef<str>>(&self, industries: &[S]) -> Vec<&Company> {
        let mut companies: Vec<&Company> = self
            .companies
            .iter()
            .filter(|c| industries.iter().any(|i| i.as_ref() == c.industry))
            .collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        companies
    }

    /// Looks a company up by exact name.
    pub fn find_by_name(&self, name: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "ダウンロード実行日,2024年06月03日現在,件数,3件\n\
        ＥＤＩＮＥＴコード,提出者種別,上場区分,提出者名,提出者業種,証券コード\n\
        E02144,内国法人・組合,上場,トヨタ自動車株式会社,輸送用機器,72030\n\
        E00000,内国法人・組合,非上場,非上場株式会社,サービス業,\n\
        E01777,内国法人・組合,上場,ソニーグループ株式会社,電気機器,67580\n\
        E02166,内国法人・組合,上場,本田技研工業株式会社,輸送用機器,72670\n";

    fn directory() -> CompanyDirectory {
        let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(LIST);
        assert!(!had_errors);
        CompanyDirectory::from_shift_jis(&bytes).unwrap()
    }

    #[test]
    fn test_loads_listed_companies() {
        let directory = directory();

        assert_eq!(directory.len(), 3);
        let toyota = directory.find_by_name("トヨタ自動車株式会社").unwrap();
        assert_eq!(toyota.industry, "輸送用機器");
        assert_eq!(toyota.securities_code.as_str(), "72030");
        assert_eq!(toyota.ticker, Some(Ticker::new("7203.T")));
        assert!(directory.find_by_name("非上場株式会社").is_none());
    }

    #[test]
    fn test_industries_sorted_and_distinct() {
        let directory = directory();
        let industries = directory.industries();

        assert_eq!(industries.len(), 2);
        let mut sorted = industries.clone();
        sorted.sort_unstable();
        assert_eq!(industries, sorted);
    }

    #[test]
    fn test_companies_in_industries_sorted_by_name() {
        let directory = directory();

        let names: Vec<&str> = directory
            .in_industries(&["輸送用機器"])
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(directory.in_industries(&["輸送用機器", "電気機器"]).len(), 3);
        assert!(directory.in_industries::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_missing_code_column() {
        let err = CompanyDirectory::from_csv("提出者名,提出者業種\nA,B\n").unwrap_err();
        assert!(matches!(err, DataError::MissingField(ref c) if c == CODE_COLUMN));
    }

    #[test]
    fn test_short_code_has_no_ticker() {
        let company = Company::new("Short", "Other", "123");
        assert_eq!(company.ticker, None);
    }
}
