//! Fuzz target for the streaming scrubber.
//!
//! Writes the same text through a redactor twice, once whole and once cut
//! at arbitrary points, and checks that both streams agree.

#![no_main]

use arbitrary::Arbitrary;
use bk_redact::Redactor;
use libfuzzer_sys::fuzz_target;
use std::io::Write;

#[derive(Debug, Arbitrary)]
struct Input {
    secrets: Vec<String>,
    text: Vec<u8>,
    cuts: Vec<u8>,
}

fn scrub(secrets: &[String], chunks: &[&[u8]]) -> Vec<u8> {
    let mut redactor = Redactor::new(Vec::new(), secrets);
    for chunk in chunks {
        redactor.write_all(chunk).unwrap();
    }
    redactor.finish().unwrap()
}

fuzz_target!(|input: Input| {
    let secrets: Vec<String> = input
        .secrets
        .into_iter()
        .filter(|s| !s.is_empty())
        .take(8)
        .collect();

    let whole = scrub(&secrets, &[&input.text]);

    let mut chunks = Vec::new();
    let mut rest: &[u8] = &input.text;
    for cut in input.cuts {
        if rest.is_empty() {
            break;
        }
        let at = (cut as usize) % (rest.len() + 1);
        let (head, tail) = rest.split_at(at);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    let split = scrub(&secrets, &chunks);

    assert_eq!(whole, split, "output depends on chunking");
});
