use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use darkvault::cipher::{decrypt_secret, derive_symmetric_key, encrypt_secret};

fn benchmark_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("cipher");
    let key = derive_symmetric_key("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

    let sizes = [("100B", 100), ("1KB", 1024), ("10KB", 10 * 1024)];
    for (name, size) in sizes {
        let plaintext = "x".repeat(size);
        let envelope = encrypt_secret(&key, &plaintext).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt", name), &plaintext, |b, p| {
            b.iter(|| encrypt_secret(&key, black_box(p)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decrypt", name), &envelope, |b, e| {
            b.iter(|| decrypt_secret(&key, black_box(e)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_cipher);
criterion_main!(benches);
