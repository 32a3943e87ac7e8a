
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ace_lex::{*};

pub fn gene_lookup_benchmark(c: &mut Criterion) {

    //Initialize a class with a good number of names
    let gene = TableId(10);
    let mut lex = Lexicon::<DefaultLexConfig, _>::open(MemoryBlockStore::new()).unwrap();
    lex.define_class(gene, ClassInfo::new("Gene").tree_typed()).unwrap();
    for i in 0..100000 {
        lex.ensure(&format!("gene-{i}"), gene).unwrap();
    }
    let unc22 = lex.ensure("unc-22", gene).unwrap();
    let twn = lex.ensure("twn-1", gene).unwrap();
    lex.rename(twn, "unc-22", false, true).unwrap();

    c.bench_function("lookup_unc22", |b| b.iter(|| black_box( {
        lex.lookup("unc-22", gene)
    })));

    c.bench_function("lookup_unc22_other_case", |b| b.iter(|| black_box( {
        lex.lookup("UNC-22", gene)
    })));

    //Goes through the alias record
    c.bench_function("lookup_alias", |b| b.iter(|| black_box( {
        lex.lookup("twn-1", gene)
    })));

    //Walks the probe sequence to an empty slot
    c.bench_function("lookup_miss", |b| b.iter(|| black_box( {
        lex.lookup("not-a-gene", gene)
    })));

    c.bench_function("name_of_key", |b| b.iter(|| black_box( {
        lex.name(unc22)
    })));

    c.bench_function("exists", |b| b.iter(|| black_box( {
        lex.exists(twn)
    })));

    c.bench_function("iterate_canonical_keys", |b| b.iter(|| black_box( {
        lex.keys(gene, IterMode::Canonical).count()
    })));
}

criterion_group!(benches, gene_lookup_benchmark);
criterion_main!(benches);

//NOTE: invoke flamegraph in criterion with:
// sudo cargo flamegraph --bench lookups -- --bench lookup_miss
