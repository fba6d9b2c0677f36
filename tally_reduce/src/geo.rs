//! Translation between the geographic code spaces.

// Letter code of each federative unit to its numeric administrative code.
const SUBDIVISION_CODES: [(&str, &str); 27] = [
    ("AC", "12"),
    ("AL", "27"),
    ("AM", "13"),
    ("AP", "16"),
    ("BA", "29"),
    ("CE", "23"),
    ("DF", "53"),
    ("ES", "32"),
    ("GO", "52"),
    ("MA", "21"),
    ("MG", "31"),
    ("MS", "50"),
    ("MT", "51"),
    ("PA", "15"),
    ("PB", "25"),
    ("PE", "26"),
    ("PI", "22"),
    ("PR", "41"),
    ("RJ", "33"),
    ("RN", "24"),
    ("RO", "11"),
    ("RR", "14"),
    ("RS", "43"),
    ("SC", "42"),
    ("SE", "28"),
    ("SP", "35"),
    ("TO", "17"),
];

/// Looks up the numeric code of a subdivision letter code.
pub fn subdivision_numeric_code(code: &str) -> Option<&'static str> {
    SUBDIVISION_CODES
        .iter()
        .find(|(letters, _)| *letters == code)
        .map(|(_, numeric)| *numeric)
}

/// True for the letter codes of the table and for the numeric codes they map to.
pub fn is_known_subdivision(code: &str) -> bool {
    SUBDIVISION_CODES
        .iter()
        .any(|(letters, numeric)| *letters == code || *numeric == code)
}

/// Converts a subdivision letter code to its numeric code.
///
/// Codes that are not in the table (national totals, votes from abroad, future
/// codes...) are returned unchanged.
pub fn translate_subdivision(code: &str) -> String {
    subdivision_numeric_code(code)
        .unwrap_or(code)
        .to_string()
}

/// Municipality codes are not reconciled: depending on the year, the source uses
/// 5-digit codes while map layers usually expect 7-digit codes. The code is passed
/// through verbatim and the consumer has to deal with the difference.
pub fn translate_municipality(code: &str) -> String {
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(translate_subdivision("SP"), "35");
        assert_eq!(translate_subdivision("AC"), "12");
        assert_eq!(translate_subdivision("DF"), "53");
        assert_eq!(translate_subdivision("TO"), "17");
    }

    #[test]
    fn unknown_codes_fall_back() {
        for code in ["BR", "ZZ", "", "sp", "35", "São Paulo", "SPX"] {
            assert_eq!(translate_subdivision(code), code);
        }
        assert_eq!(subdivision_numeric_code("ZZ"), None);
    }

    #[test]
    fn numeric_codes_are_known() {
        assert!(is_known_subdivision("SP"));
        assert!(is_known_subdivision("35"));
        assert!(is_known_subdivision("17"));
        assert!(!is_known_subdivision("ZZ"));
        assert!(!is_known_subdivision("99"));
        assert!(!is_known_subdivision(""));
    }

    #[test]
    fn table_is_a_bijection() {
        let mut letters: Vec<&str> = SUBDIVISION_CODES.iter().map(|p| p.0).collect();
        let mut numbers: Vec<&str> = SUBDIVISION_CODES.iter().map(|p| p.1).collect();
        letters.sort();
        letters.dedup();
        numbers.sort();
        numbers.dedup();
        assert_eq!(letters.len(), 27);
        assert_eq!(numbers.len(), 27);
    }

    #[test]
    fn municipality_codes_are_verbatim() {
        assert_eq!(translate_municipality("01007"), "01007");
        assert_eq!(translate_municipality("3550308"), "3550308");
    }
}
