use time::format_description::well_known::Iso8601;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse an ISO-8601 timestamp as found in dump attributes
/// (`2010-09-13T19:16:26.763`). Values carrying an explicit offset are
/// normalized to UTC and the offset is dropped.
pub fn parse_iso8601(s: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    let s = s.trim();
    if let Ok(odt) = OffsetDateTime::parse(s, &Iso8601::DEFAULT) {
        let utc = odt.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_dump_format_with_millis() {
        let dt = parse_iso8601("2010-09-13T19:16:26.763").unwrap();
        assert_eq!(dt, datetime!(2010-09-13 19:16:26.763));
    }

    #[test]
    fn parses_without_fraction() {
        let dt = parse_iso8601("2009-01-02T03:04:05").unwrap();
        assert_eq!(dt, datetime!(2009-01-02 03:04:05));
    }

    #[test]
    fn offset_values_are_normalized_to_utc() {
        let dt = parse_iso8601("2009-01-02T03:04:05+02:00").unwrap();
        assert_eq!(dt, datetime!(2009-01-02 01:04:05));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_iso8601("yesterday").is_err());
        assert!(parse_iso8601("2009-13-40T00:00:00").is_err());
    }
}
