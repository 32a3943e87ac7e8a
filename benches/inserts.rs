use std::path::PathBuf;

use csv::ReaderBuilder;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ace_lex::*;
use serde::Deserialize;

pub fn insert_benchmark(c: &mut Criterion) {

    let mut tsv_file_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    tsv_file_path.push("test_data/worm_genes.tsv");

    #[derive(Clone, Debug, Deserialize)]
    struct WormGene {
        #[allow(dead_code)]
        gene_id: String,
        public_name: String,
        sequence_name: String,
    }

    //Open the tab-saparated value file
    let tsv_file_contents = std::fs::read_to_string(tsv_file_path).expect("Error reading gene file");
    let mut tsv_parser = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(tsv_file_contents.as_bytes());
    let genes: Vec<WormGene> = tsv_parser.deserialize::<WormGene>().map(|result| result.unwrap()).collect();

    let gene = TableId(10);
    let sequence = TableId(11);
    let paper = TableId(12);
    let new_lexicon = || {
        let mut lex = Lexicon::<DefaultLexConfig, _>::open(MemoryBlockStore::new()).unwrap();
        lex.define_class(gene, ClassInfo::new("Gene").tree_typed()).unwrap();
        lex.define_class(sequence, ClassInfo::new("Sequence").case_sensitive()).unwrap();
        lex.define_class(paper, ClassInfo::new("Paper")).unwrap();
        lex
    };

    //Every name is new, so every ensure inserts
    c.bench_function("ensure_fresh_genes", |b| b.iter(|| {
        let mut lex = new_lexicon();
        for row in genes.iter() {
            black_box(lex.ensure(&row.public_name, gene).unwrap());
            black_box(lex.ensure(&row.sequence_name, sequence).unwrap());
        }
    }));

    //A lookup that misses, followed by the insert it was asking about
    c.bench_function("lookup_then_ensure_hinted", |b| b.iter(|| {
        let mut lex = new_lexicon();
        for row in genes.iter() {
            let (found, hint) = lex.lookup_hinted(&row.public_name, gene);
            if found.is_none() {
                black_box(lex.ensure_hinted(&row.public_name, gene, hint).unwrap());
            }
        }
    }));

    //Many synthetic names, to exercise the hash growth
    c.bench_function("ensure_10000_papers", |b| b.iter(|| {
        let mut lex = new_lexicon();
        for i in 0..10000 {
            black_box(lex.ensure(&format!("WBPaper{i:08}"), paper).unwrap());
        }
    }));

    //Everything is already there, so ensure is a lookup
    let mut lex = new_lexicon();
    for row in genes.iter() {
        lex.ensure(&row.public_name, gene).unwrap();
    }
    c.bench_function("ensure_existing_genes", |b| b.iter(|| {
        for row in genes.iter() {
            black_box(lex.ensure(&row.public_name, gene).unwrap());
        }
    }));

    c.bench_function("save_and_reload", |b| b.iter(|| {
        lex.save().unwrap();
        lex.clear_table(gene).unwrap();
        black_box(lex.lookup("unc-22", gene));
    }));
}

criterion_group!(benches, insert_benchmark);
criterion_main!(benches);
