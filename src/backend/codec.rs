//! The line protocol's wire framing and message-spec table (spec.md §4.E).
//! ASCII lines terminated by `\r\n`, each line a colon-delimited field
//! sequence whose first field is `<verb><sender>` — the verb prefix
//! immediately concatenated with the sender's callsign, never a separate
//! field.

use crate::error::Error;
use crate::world::World;
use radix_fmt::radix;

/// Splits one already-trimmed line into its colon-delimited fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(':').collect()
}

/// Pulls the verb prefix and sender callsign out of field 0, given the
/// known verb. `field0` is `<verb><sender>` concatenated with no separator.
pub fn split_verb_and_sender<'a>(field0: &'a str, verb: &str) -> Option<&'a str> {
    field0.strip_prefix(verb)
}

pub type Handler = fn(sender: &str, fields: &[&str], world: &mut World, now: i64) -> Result<(), Error>;

/// One row of the ordered message-spec table: a verb prefix to match field
/// 0 against, zero or more fixed-string matches at specific field indices,
/// a minimum field count, and the handler to run on the first match.
pub struct MessageSpec {
    pub verb: &'static str,
    /// `(field index, expected value)` pairs; all must match.
    pub field_matches: &'static [(usize, &'static str)],
    pub min_fields: usize,
    pub handler: Handler,
}

impl MessageSpec {
    /// Tests whether `fields` (with `sender` already split out of field 0)
    /// matches this spec.
    fn matches(&self, field0: &str, fields: &[&str]) -> Option<String> {
        let sender = split_verb_and_sender(field0, self.verb)?;
        if fields.len() < self.min_fields {
            return None;
        }
        for (idx, expected) in self.field_matches {
            if fields.get(*idx) != Some(expected) {
                return None;
            }
        }
        Some(sender.to_string())
    }
}

/// Matches `line` against `table` in order and runs the first matching
/// spec's handler. Returns `Ok(true)` if a spec matched (regardless of
/// whether the handler itself errored), `Ok(false)` if no spec matched
/// (the line is dropped, per spec.md §4.E), or the handler's error.
pub fn dispatch_line(
    line: &str,
    table: &[MessageSpec],
    world: &mut World,
    now: i64,
) -> Result<bool, Error> {
    let fields = split_fields(line);
    let field0 = match fields.first() {
        Some(f) => *f,
        None => return Ok(false),
    };

    for spec in table {
        if let Some(sender) = spec.matches(field0, &fields) {
            (spec.handler)(&sender, &fields[1..], world, now)?;
            return Ok(true);
        }
    }

    Ok(false)
}

/// Formats a squawk as four octal digits, per spec.md §6.
pub fn format_squawk_octal(squawk: u16) -> String {
    format!("{:0>4}", radix(squawk, 8).to_string())
}

/// Assembles an outgoing message: `<verb><sender>` then the remaining
/// fields joined by `:`, terminated with `\r\n`.
pub fn encode_message(verb: &str, sender: &str, fields: &[&str]) -> String {
    let mut out = format!("{}{}", verb, sender);
    for field in fields {
        out.push(':');
        out.push_str(field);
    }
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    fn noop_handler(_: &str, _: &[&str], _: &mut World, _: i64) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn encodes_with_sender_concatenated_onto_first_field() {
        let msg = encode_message("$CQ", "JFK_TWR", &["SERVER", "FP", "AAL123"]);
        assert_eq!(msg, "$CQJFK_TWR:SERVER:FP:AAL123\r\n");
    }

    #[test]
    fn octal_squawk_is_zero_padded() {
        assert_eq!(format_squawk_octal(0o1200), "1200");
        assert_eq!(format_squawk_octal(0o7), "0007");
    }

    #[test]
    fn first_matching_spec_wins() {
        static HITS: std::sync::atomic::AtomicU8 = std::sync::atomic::AtomicU8::new(0);
        fn first(_: &str, _: &[&str], _: &mut World, _: i64) -> Result<(), Error> {
            HITS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
        fn second(_: &str, _: &[&str], _: &mut World, _: i64) -> Result<(), Error> {
            HITS.fetch_add(10, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        let table = [
            MessageSpec {
                verb: "$HO",
                field_matches: &[(1, "OFFER")],
                min_fields: 3,
                handler: first,
            },
            MessageSpec {
                verb: "$HO",
                field_matches: &[],
                min_fields: 1,
                handler: second,
            },
        ];

        let mut world = World::new();
        let matched = dispatch_line("$HOJFK_TWR:OFFER:N90_APP:AAL123", &table, &mut world, 0).unwrap();
        assert!(matched);
        assert_eq!(HITS.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn unmatched_line_is_dropped_not_erroring() {
        let table = [MessageSpec {
            verb: "$HO",
            field_matches: &[],
            min_fields: 1,
            handler: noop_handler,
        }];
        let mut world = World::new();
        let matched = dispatch_line("#UNKNOWNSERVER:blah", &table, &mut world, 0).unwrap();
        assert!(!matched);
    }

    #[test]
    fn min_field_count_is_enforced() {
        let table = [MessageSpec {
            verb: "$HO",
            field_matches: &[],
            min_fields: 5,
            handler: noop_handler,
        }];
        let mut world = World::new();
        let matched = dispatch_line("$HOJFK_TWR:N90_APP", &table, &mut world, 0).unwrap();
        assert!(!matched);
    }
}
