//! Chronologically sortable 20-character keys in the Firebase push-id format:
//! 8 characters of millisecond timestamp followed by 12 random characters.

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_ms: u64,
    last_rand: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are strictly increasing for one generator, even when the clock
    /// stalls or steps backwards.
    pub fn next_id(&mut self, now_ms: u64) -> String {
        let now_ms = now_ms.max(self.last_ms);
        if now_ms == self.last_ms && self.last_ms != 0 {
            self.bump();
        } else {
            self.reseed();
        }
        self.last_ms = now_ms;

        let mut out = [0u8; 20];
        let mut ts = now_ms;
        for slot in out[..8].iter_mut().rev() {
            *slot = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        for (slot, r) in out[8..].iter_mut().zip(self.last_rand) {
            *slot = PUSH_CHARS[r as usize];
        }
        out.iter().map(|&b| b as char).collect()
    }

    fn reseed(&mut self) {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        // byte 6 carries the uuid version nibble
        let random = bytes.iter().enumerate().filter(|(i, _)| *i != 6);
        for (slot, (_, b)) in self.last_rand.iter_mut().zip(random) {
            *slot = b % 64;
        }
    }

    fn bump(&mut self) {
        for digit in self.last_rand.iter_mut().rev() {
            if *digit == 63 {
                *digit = 0;
            } else {
                *digit += 1;
                break;
            }
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_twenty_chars_from_alphabet() {
        let id = PushIdGenerator::new().next_id(1_700_000_000_000);
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn same_millisecond_ids_still_increase() {
        let mut ids = PushIdGenerator::new();
        let mut prev = ids.next_id(42_000);
        for _ in 0..500 {
            let next = ids.next_id(42_000);
            assert!(next > prev, "{next} <= {prev}");
            prev = next;
        }
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let mut ids = PushIdGenerator::new();
        let a = ids.next_id(1_000);
        let b = ids.next_id(2_000);
        let c = ids.next_id(1_500);
        assert!(a < b);
        assert!(b < c, "clock going backwards must not reorder ids");
    }
}
