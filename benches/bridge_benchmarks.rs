//! Performance benchmarks for the bridge surface
//!
//! Run with: cargo bench
//!
//! Each iteration runs inside its own handle scope so that benchmark loops
//! measure the bridge call, not an ever-growing outer scope.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quickbridge::prelude::*;

/// Benchmark: environment setup (intrinsics and global object)
fn bench_env_setup(c: &mut Criterion) {
    c.bench_function("env_setup", |b| {
        b.iter(|| {
            let env = Env::new();
            black_box(env)
        })
    });
}

/// Benchmark: minting primitive and object values
fn bench_value_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("values");

    group.bench_function("double", |b| {
        let mut env = Env::new();
        b.iter(|| {
            env.with_scope(|env| {
                let v = env.double(black_box(1.5));
                env.as_double(v)
            })
            .unwrap()
        })
    });

    group.bench_function("object", |b| {
        let mut env = Env::new();
        b.iter(|| env.with_scope(|env| Ok(black_box(env.object()))).unwrap())
    });

    group.bench_function("to_number_of_string", |b| {
        let mut env = Env::new();
        b.iter(|| {
            env.with_scope(|env| {
                let s = env.string_utf8(black_box("12345.678"))?;
                env.to_number(s)
            })
            .unwrap()
        })
    });

    group.finish();
}

/// Benchmark: property reads and writes
fn bench_properties(c: &mut Criterion) {
    let mut group = c.benchmark_group("properties");

    group.bench_function("set_named", |b| {
        let mut env = Env::new();
        let obj = env.object();
        b.iter(|| {
            env.with_scope(|env| {
                let v = env.int32(7);
                env.set_named_property(obj, black_box("field"), v)
            })
            .unwrap()
        })
    });

    group.bench_function("get_inherited", |b| {
        let mut env = Env::new();
        let proto = env.object();
        let v = env.int32(7);
        env.set_named_property(proto, "inherited", v).unwrap();
        let obj = env.object();
        env.set_prototype(obj, proto).unwrap();
        b.iter(|| {
            env.with_scope(|env| {
                let v = env.get_named_property(obj, black_box("inherited"))?;
                env.as_int32(v)
            })
            .unwrap()
        })
    });

    for size in [10u32, 100] {
        group.bench_with_input(BenchmarkId::new("own_keys", size), &size, |b, &size| {
            let mut env = Env::new();
            let obj = env.object();
            for i in 0..size {
                let v = env.uint32(i);
                env.set_named_property(obj, &format!("key{}", i), v).unwrap();
            }
            b.iter(|| env.own_keys(obj).unwrap())
        });
    }

    group.finish();
}

/// Benchmark: native function calls through the callable bridge
fn bench_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("calls");

    group.bench_function("native_call", |b| {
        let mut env = Env::new();
        let add = env.create_function(Some("add"), |env, info| {
            let a = env.as_double(info.arg(0))?;
            let b = env.as_double(info.arg(1))?;
            Ok(env.double(a + b))
        });
        let undefined = env.undefined();
        b.iter(|| {
            env.with_scope(|env| {
                let a = env.double(1.0);
                let b = env.double(2.0);
                let sum = env.call(add, undefined, &[a, b])?;
                env.as_double(sum)
            })
            .unwrap()
        })
    });

    group.bench_function("construct_class", |b| {
        let mut env = Env::new();
        let point = env
            .define_class("Point", |_, info| Ok(info.this()), &[])
            .unwrap();
        b.iter(|| env.with_scope(|env| env.construct(point, &[])).unwrap())
    });

    group.finish();
}

/// Benchmark: copying strings out into caller buffers
fn bench_string_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");
    let text = "h€llo wörld 😀 ".repeat(64);
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("utf8_copy", |b| {
        let mut env = Env::new();
        let value = env.string_utf8(&text).unwrap();
        let mut buf = vec![0u8; text.len() + 1];
        b.iter(|| env.get_value_string_utf8(value, black_box(&mut buf)).unwrap())
    });

    group.bench_function("utf16_copy", |b| {
        let mut env = Env::new();
        let value = env.string_utf8(&text).unwrap();
        let mut buf = vec![0u16; text.len() + 1];
        b.iter(|| env.get_value_string_utf16(value, black_box(&mut buf)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_env_setup,
    bench_value_creation,
    bench_properties,
    bench_calls,
    bench_string_copy,
);
criterion_main!(benches);
