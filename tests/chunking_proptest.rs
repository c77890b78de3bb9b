//! Property tests: how the input is cut into `parse` calls must not change
//! what handlers observe.

use proptest::prelude::*;
use proptest::sample::Index;

use hookwire::{Entry, ErrorKind, EventKind, Instance, Parser, Recorder};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Feed `data` split at `cuts` (sorted, possibly repeated) and return the
/// merged transcript plus the error, if any.
fn transcript(data: &[u8], cuts: &[usize]) -> (Vec<Entry>, Option<ErrorKind>) {
    let recorder = Recorder::new();
    let parser = Parser::with_handler(&recorder);
    let mut inst = Instance::new();

    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&data.len())) {
        // An empty slice would mean end of stream.
        if cut <= start {
            continue;
        }
        if !parser.parse(&mut inst, &data[start..cut]) {
            break;
        }
        start = cut;
    }

    (recorder.entries(), inst.error().map(|e| e.kind()))
}

fn cut_points(len: usize, picks: &[Index]) -> Vec<usize> {
    let mut cuts: Vec<usize> = picks.iter().map(|p| p.index(len + 1)).collect();
    cuts.sort_unstable();
    cuts
}

fn request() -> impl Strategy<Value = (String, Vec<u8>)> {
    let method = prop::sample::select(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"]);
    let url = "/[a-zA-Z0-9/._~?=&%-]{0,30}";
    let headers = prop::collection::vec(("X-[A-Za-z0-9-]{1,12}", "[!-~]([ !-~]{0,20}[!-~])?"), 0..5);
    let body = "[ -~]{0,40}";

    (method, url, headers, body).prop_map(|(method, url, headers, body)| {
        let mut raw = format!("{method} {url} HTTP/1.1\r\n");
        for (name, value) in &headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        if !body.is_empty() {
            raw.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        raw.push_str("\r\n");
        raw.push_str(&body);
        (url, raw.into_bytes())
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// The url fragments always concatenate to the full request target.
    #[test]
    fn url_survives_any_split((url, raw) in request(), picks in prop::collection::vec(any::<Index>(), 0..6)) {
        let cuts = cut_points(raw.len(), &picks);
        let (entries, error) = transcript(&raw, &cuts);

        prop_assert_eq!(error, None);
        let urls: Vec<&str> = entries
            .iter()
            .filter(|e| e.event == EventKind::Url)
            .filter_map(|e| e.data.as_deref())
            .collect();
        prop_assert_eq!(urls.concat(), url);
    }

    /// Splitting a valid request anywhere yields the same transcript as
    /// parsing it in one piece.
    #[test]
    fn transcript_is_split_invariant((_url, raw) in request(), picks in prop::collection::vec(any::<Index>(), 1..8)) {
        let whole = transcript(&raw, &[]);
        let split = transcript(&raw, &cut_points(raw.len(), &picks));

        prop_assert_eq!(whole.1, None);
        prop_assert_eq!(&whole.0, &split.0);
        prop_assert_eq!(whole.0.last().map(|e| e.event), Some(EventKind::MessageComplete));
    }

    /// Garbage never panics and never leaves a half-reported failure.
    #[test]
    fn arbitrary_bytes_never_panic(input in prop::collection::vec(any::<u8>(), 1..300)) {
        let recorder = Recorder::new();
        let parser = Parser::with_handler(&recorder);
        let mut inst = Instance::new();

        let ok = parser.parse(&mut inst, &input);
        prop_assert_eq!(ok, !inst.has_error());
    }
}
