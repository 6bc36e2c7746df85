//! Cursor walk over `NEXTPOSITION` with cycle detection and a hard page
//! guardrail. Used directly by the `iter_*` facade operations; the
//! orchestrator's own chunk/page loop uses the narrower
//! [`crate::planner::next_position_or_raise`] helper instead, which raises
//! `ValidationError` rather than `ProtocolError` for the same condition
//! (see the planner module docs for why the two are kept separate).

use std::collections::HashSet;

use serde_json::Value;

use crate::error::BojApiError;

/// Default guardrail: walking this many pages without reaching end-of-
/// stream is treated as a protocol violation rather than trusted forever.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Parse the `NEXTPOSITION` field. Accepted encodings: an integer, a
/// non-empty decimal digit string, or empty-string/null/absent meaning
/// end-of-stream. Any other shape is a protocol error.
pub fn parse_next_position(raw: Option<Value>) -> Result<Option<u64>, BojApiError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| protocol_error("NEXTPOSITION is not a non-negative integer")),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) if s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse::<u64>().map(Some).map_err(|_| protocol_error("NEXTPOSITION digit string overflow"))
        }
        Some(_) => Err(protocol_error("NEXTPOSITION has an unrecognized shape")),
    }
}

fn protocol_error(message: &str) -> BojApiError {
    BojApiError::Protocol { message: message.to_string(), status: None, message_id: None, http_status: None }
}

/// Tracks seen cursor positions across a page walk and enforces the hard
/// page-count guardrail. Shared by the sync and async page iterators.
#[derive(Debug)]
pub struct PageCursor {
    seen: HashSet<u64>,
    max_pages: usize,
    pages_seen: usize,
}

impl PageCursor {
    pub fn new(max_pages: usize) -> Self {
        Self { seen: HashSet::new(), max_pages, pages_seen: 0 }
    }

    /// Whether `max_pages` pages have already been fetched without reaching
    /// end-of-stream. Checked *before* issuing the next fetch, so the
    /// guardrail never lets a `max_pages + 1`th page go out over the wire —
    /// it raises in its place instead.
    pub fn at_limit(&self) -> bool {
        self.pages_seen >= self.max_pages
    }

    /// Record that a page was fetched and validate its `NEXTPOSITION`.
    /// Returns `Ok(None)` at end-of-stream. Callers must consult
    /// [`PageCursor::at_limit`] before fetching the page being recorded here.
    pub fn record(&mut self, next_raw: Option<Value>) -> Result<Option<u64>, BojApiError> {
        self.pages_seen += 1;
        let next = parse_next_position(next_raw)?;
        if let Some(position) = next {
            if !self.seen.insert(position) {
                return Err(protocol_error("NEXTPOSITION loop detected"));
            }
        }
        Ok(next)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

/// A lazily-evaluated sequence of pages. `fetch_page` is called with the
/// current cursor position and must return the decoded page value plus
/// its raw `NEXTPOSITION`. Dropping the iterator before exhaustion (e.g.
/// consumer early-stop) releases whatever `fetch_page` was holding, since
/// it holds no resources of its own beyond the closure's captures.
pub struct PageIterator<T, F>
where
    F: FnMut(u64) -> Result<(T, Option<Value>), BojApiError>,
{
    fetch_page: F,
    cursor: PageCursor,
    next_position: Option<u64>,
    done: bool,
}

impl<T, F> PageIterator<T, F>
where
    F: FnMut(u64) -> Result<(T, Option<Value>), BojApiError>,
{
    pub fn new(fetch_page: F, start_position: u64, max_pages: usize) -> Self {
        Self {
            fetch_page,
            cursor: PageCursor::new(max_pages),
            next_position: Some(start_position),
            done: false,
        }
    }
}

impl<T, F> Iterator for PageIterator<T, F>
where
    F: FnMut(u64) -> Result<(T, Option<Value>), BojApiError>,
{
    type Item = Result<T, BojApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let position = self.next_position?;
        if self.cursor.at_limit() {
            self.done = true;
            return Some(Err(protocol_error("pagination guardrail exceeded")));
        }
        match (self.fetch_page)(position) {
            Ok((page, next_raw)) => match self.cursor.record(next_raw) {
                Ok(next) => {
                    self.next_position = next;
                    if next.is_none() {
                        self.done = true;
                    }
                    Some(Ok(page))
                }
                Err(err) => {
                    self.done = true;
                    Some(Err(err))
                }
            },
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_cursor_parses() {
        assert_eq!(parse_next_position(Some(json!(42))).unwrap(), Some(42));
    }

    #[test]
    fn digit_string_cursor_parses() {
        assert_eq!(parse_next_position(Some(json!("42"))).unwrap(), Some(42));
    }

    #[test]
    fn empty_string_or_null_means_end() {
        assert_eq!(parse_next_position(Some(json!(""))).unwrap(), None);
        assert_eq!(parse_next_position(Some(Value::Null)).unwrap(), None);
        assert_eq!(parse_next_position(None).unwrap(), None);
    }

    #[test]
    fn non_digit_string_is_protocol_error() {
        assert!(parse_next_position(Some(json!("abc"))).is_err());
    }

    #[test]
    fn revisited_position_is_a_loop() {
        let mut cursor = PageCursor::new(10);
        assert_eq!(cursor.record(Some(json!(2))).unwrap(), Some(2));
        assert!(cursor.record(Some(json!(2))).is_err());
    }

    #[test]
    fn at_limit_trips_after_exactly_max_pages_recorded() {
        let mut cursor = PageCursor::new(2);
        assert!(!cursor.at_limit());
        cursor.record(Some(json!(1))).unwrap();
        assert!(!cursor.at_limit());
        cursor.record(Some(json!(2))).unwrap();
        assert!(cursor.at_limit());
    }

    #[test]
    fn iterator_stops_at_end_of_stream() {
        let mut calls = 0;
        let iter = PageIterator::new(
            |position| {
                calls += 1;
                if position == 1 {
                    Ok((position, Some(json!(2))))
                } else {
                    Ok((position, Some(json!(""))))
                }
            },
            1,
            10,
        );
        let pages: Vec<_> = iter.collect::<Result<_, _>>().unwrap();
        assert_eq!(pages, vec![1, 2]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn iterator_can_be_dropped_early() {
        let mut iter = PageIterator::new(|position| Ok((position, Some(json!(position + 1)))), 1, 10);
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        drop(iter);
    }

    #[test]
    fn guardrail_performs_exactly_max_pages_fetches_never_one_more() {
        let mut calls = 0;
        let iter = PageIterator::new(
            |position| {
                calls += 1;
                Ok((position, Some(json!(position + 1))))
            },
            1,
            2,
        );
        let results: Vec<_> = iter.collect();
        assert_eq!(calls, 2);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].as_ref().is_err());
    }
}
