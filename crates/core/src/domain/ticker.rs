use std::collections::HashSet;
use std::fmt;

/// Exchange-assigned code identifying a tradable instrument, stored trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Normalizes `raw` (trim + uppercase). Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_uppercase();
        if s.is_empty() {
            return None;
        }
        Some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TickerSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered symbols, unique by first occurrence. Blank entries never make it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TickerList {
    symbols: Vec<TickerSymbol>,
}

impl TickerList {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        for entry in entries {
            let Some(symbol) = TickerSymbol::parse(entry.as_ref()) else {
                continue;
            };
            if seen.insert(symbol.clone()) {
                symbols.push(symbol);
            }
        }
        Self { symbols }
    }

    /// Splits free-form user text on commas.
    pub fn parse_comma_separated(text: &str) -> Self {
        Self::from_entries(text.split(','))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TickerSymbol> {
        self.symbols.iter()
    }

    pub fn as_slice(&self) -> &[TickerSymbol] {
        &self.symbols
    }

    /// Comma-joined form, suitable for a text field or a `?tickers=` link.
    pub fn to_comma_separated(&self) -> String {
        self.symbols
            .iter()
            .map(TickerSymbol::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a TickerList {
    type Item = &'a TickerSymbol;
    type IntoIter = std::slice::Iter<'a, TickerSymbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
