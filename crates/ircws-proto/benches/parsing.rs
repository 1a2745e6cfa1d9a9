//! Benchmarks for line framing and message parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ircws_proto::{FrameReader, Message};

const SIMPLE_MESSAGE: &str = "PING :irc.example.com";

const PREFIX_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

const TAGGED_MESSAGE: &str = "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Hello with tags!";

const NAMES_REPLY: &str = ":irc.example.net 353 me = #rust :@alice +bob carol dave erin frank grace heidi ivan judy";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message Parsing");

    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("with_prefix", PREFIX_MESSAGE),
        ("with_tags", TAGGED_MESSAGE),
        ("names_reply", NAMES_REPLY),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let msg: Message = black_box(line).parse().unwrap();
                black_box(msg)
            })
        });
    }

    group.finish();
}

fn benchmark_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Line Framing");
    let stream: String = (0..64).map(|i| format!("{PREFIX_MESSAGE} {i}\r\n")).collect();

    for chunk_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::new("chunked", chunk_size),
            &chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut reader = FrameReader::new();
                    let mut lines = 0;
                    for chunk in stream.as_bytes().chunks(size) {
                        // The stream is ASCII, so every byte boundary is a char boundary.
                        let chunk = std::str::from_utf8(chunk).unwrap();
                        lines += reader.push(chunk).len();
                    }
                    black_box(lines)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_parsing, benchmark_framing);
criterion_main!(benches);
