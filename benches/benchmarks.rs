use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::io::Cursor;

use tailmap::index::{sa, Index, IndexMeta, Reference};
use tailmap::io::fasta::FastaReader;
use tailmap::search::{map_read, SearchOpt};
use tailmap::util::dna;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

fn build_index(seq: &[u8]) -> Index {
    let fasta = [&b">bench\n"[..], seq, &b"\n"[..]].concat();
    let reference = FastaReader::new(Cursor::new(fasta));
    let reference = Reference::from_fasta(reference).unwrap();
    Index::build(reference, 64, 512, IndexMeta::default()).unwrap()
}

fn bench_build_sa(c: &mut Criterion) {
    let seq = make_reference(10_000);
    let mut ranks: Vec<u8> = seq.iter().map(|&b| dna::encode(b).unwrap() + 1).collect();
    ranks.push(0);

    c.bench_function("build_sa_10kb", |b| {
        b.iter(|| {
            black_box(sa::build_sa(black_box(&ranks)));
        })
    });
}

fn bench_exact_prefix_search(c: &mut Criterion) {
    let seq = make_reference(50_000);
    let index = build_index(&seq);
    let mut read = seq[1_000..1_025].to_vec();
    read.extend_from_slice(b"AAA"); // non-templated tail
    let query = dna::encode_read(&read).unwrap();
    let opt = SearchOpt { min_len: 18, allow_mismatch: false };

    c.bench_function("prefix_search_25bp_tail3", |b| {
        b.iter(|| {
            black_box(map_read(black_box(&index), black_box(&query), &opt));
        })
    });
}

fn bench_mismatch_prefix_search(c: &mut Criterion) {
    let seq = make_reference(50_000);
    let index = build_index(&seq);
    let mut read = seq[2_000..2_030].to_vec();
    read[15] = dna::complement(read[15]); // force one internal substitution
    let query = dna::encode_read(&read).unwrap();
    let opt = SearchOpt { min_len: 18, allow_mismatch: true };

    c.bench_function("prefix_search_mismatch_30bp", |b| {
        b.iter(|| {
            black_box(map_read(black_box(&index), black_box(&query), &opt));
        })
    });
}

fn bench_locate(c: &mut Criterion) {
    let seq = make_reference(50_000);
    let index = build_index(&seq);
    let query = dna::encode_read(&seq[5_000..5_020]).unwrap();
    let opt = SearchOpt { min_len: 20, allow_mismatch: false };

    c.bench_function("locate_20bp_hits", |b| {
        b.iter(|| {
            let m = map_read(&index, &query, &opt).unwrap();
            black_box(m.hits.len());
        })
    });
}

criterion_group!(
    benches,
    bench_build_sa,
    bench_exact_prefix_search,
    bench_mismatch_prefix_search,
    bench_locate
);
criterion_main!(benches);
