//! ABI decoding of `PathzChoosed` logs.
//!
//! Event: `PathzChoosed(uint16 indexed pathStoryNumber, string letterChoosed, uint16 pathzID)`.
//! The story number is carried in `topics[1]`; the letter and token id are
//! ABI-encoded in `data` as `(offset, pathzID, len, bytes...)`.

use super::rpc::RawLog;
use crate::domain::ContractEvent;
use crate::error::RelayError;

/// Canonical signature of the relayed event.
pub const PATHZ_CHOOSED_SIGNATURE: &str = "PathzChoosed(uint16,string,uint16)";

/// `keccak256(PATHZ_CHOOSED_SIGNATURE)`, the event's `topics[0]`.
pub const PATHZ_CHOOSED_TOPIC: &str =
    "0x58ea22c815dc65587d775c92b359f2b6e523907f5bf29c64bf462108682b3677";

const WORD: usize = 32;

/// Decodes one `PathzChoosed` log into a [`ContractEvent`].
///
/// # Errors
///
/// Returns [`RelayError::Decode`] if the log carries another event, is
/// truncated, holds values out of range for their ABI type, or the letter
/// is not valid UTF-8.
pub fn decode_log(log: &RawLog) -> Result<ContractEvent, RelayError> {
    let signature = log
        .topics
        .first()
        .ok_or_else(|| decode_err("log has no topics"))?;
    if !signature.eq_ignore_ascii_case(PATHZ_CHOOSED_TOPIC) {
        return Err(decode_err(format!("unexpected event topic {signature}")));
    }

    let story_topic = log
        .topics
        .get(1)
        .ok_or_else(|| decode_err("missing indexed pathStoryNumber"))?;
    let story_id = word_to_u16(&decode_hex(story_topic)?)?;

    let data = decode_hex(&log.data)?;
    let offset = word_to_usize(word_at(&data, 0)?)?;
    let pathz_id = word_to_u16(word_at(&data, WORD)?)?;

    let len = word_to_usize(word_at(&data, offset)?)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| decode_err("string offset overflows"))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| decode_err("string length overflows"))?;
    let raw = data
        .get(start..end)
        .ok_or_else(|| decode_err("string runs past end of data"))?;
    let letter = std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| decode_err(format!("letter is not UTF-8: {e}")))?;

    Ok(ContractEvent::PathzChoosed {
        story_id,
        letter,
        pathz_id,
        block_number: parse_quantity(&log.block_number)?,
    })
}

/// Parses a JSON-RPC hex quantity such as `0x3e8`.
///
/// # Errors
///
/// Returns [`RelayError::Decode`] if the value is empty, not hex, or does
/// not fit in a `u64`.
pub fn parse_quantity(quantity: &str) -> Result<u64, RelayError> {
    let digits = strip_0x(quantity);
    if digits.is_empty() {
        return Err(decode_err(format!("empty quantity {quantity:?}")));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| decode_err(format!("invalid quantity {quantity:?}: {e}")))
}

fn decode_err(message: impl Into<String>) -> RelayError {
    RelayError::Decode(message.into())
}

fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn decode_hex(value: &str) -> Result<Vec<u8>, RelayError> {
    hex::decode(strip_0x(value)).map_err(|e| decode_err(format!("invalid hex: {e}")))
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], RelayError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| decode_err(format!("no ABI word at offset {offset}")))
}

fn word_to_u64(word: &[u8]) -> Result<u64, RelayError> {
    if word.len() != WORD {
        return Err(decode_err(format!("expected {WORD}-byte word, got {}", word.len())));
    }
    let Some((high, low)) = word.split_at_checked(WORD - 8) else {
        return Err(decode_err("short ABI word"));
    };
    if high.iter().any(|b| *b != 0) {
        return Err(decode_err("ABI word exceeds 64 bits"));
    }
    let low: [u8; 8] = low
        .try_into()
        .map_err(|_| decode_err("short ABI word"))?;
    Ok(u64::from_be_bytes(low))
}

fn word_to_u16(word: &[u8]) -> Result<u16, RelayError> {
    let value = word_to_u64(word)?;
    u16::try_from(value).map_err(|_| decode_err(format!("{value} does not fit uint16")))
}

fn word_to_usize(word: &[u8]) -> Result<usize, RelayError> {
    let value = word_to_u64(word)?;
    usize::try_from(value).map_err(|_| decode_err(format!("{value} does not fit usize")))
}


#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::test_support::pathz_log;
    use super::*;

    #[test]
    fn decodes_pathz_choosed() {
        let log = pathz_log(3, "z", 17, 1000);
        let decoded = decode_log(&log);
        assert_eq!(
            decoded.ok(),
            Some(ContractEvent::PathzChoosed {
                story_id: 3,
                letter: "z".to_string(),
                pathz_id: 17,
                block_number: 1000,
            })
        );
    }

    #[test]
    fn decodes_multi_word_letter() {
        let letter = "a".repeat(40);
        let log = pathz_log(1, &letter, 2, 5);
        let Ok(ContractEvent::PathzChoosed { letter: got, .. }) = decode_log(&log) else {
            panic!("expected a decoded event");
        };
        assert_eq!(got, letter);
    }

    #[test]
    fn rejects_other_topics() {
        let mut log = pathz_log(3, "z", 17, 1000);
        if let Some(topic) = log.topics.first_mut() {
            *topic = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".to_string();
        }
        assert!(matches!(decode_log(&log), Err(RelayError::Decode(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut log = pathz_log(3, "z", 17, 1000);
        log.data.truncate(2 + 64 * 2);
        assert!(matches!(decode_log(&log), Err(RelayError::Decode(_))));
    }

    #[test]
    fn rejects_out_of_range_story() {
        let mut log = pathz_log(3, "z", 17, 1000);
        log.topics = vec![PATHZ_CHOOSED_TOPIC.to_string(), format!("0x{:064x}", 70_000)];
        assert!(matches!(decode_log(&log), Err(RelayError::Decode(_))));
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("0x3e8").ok(), Some(1000));
        assert_eq!(parse_quantity("0x0").ok(), Some(0));
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }
}
