use page_crypto::{generate_file_key, x25519, Decryptor, Encryptor, IdentityKey, Recipient, Stream};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_stream_encrypt(bencher: divan::Bencher, size: usize) {
    let file_key = generate_file_key();
    let nonce = [0xABu8; 16];
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            Stream::encrypt(
                divan::black_box(&file_key),
                divan::black_box(&nonce),
                divan::black_box(&data),
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_stream_decrypt(bencher: divan::Bencher, size: usize) {
    let file_key = generate_file_key();
    let nonce = [0xABu8; 16];
    let data = make_data(size);
    let encrypted = Stream::encrypt(&file_key, &nonce, &data).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            Stream::decrypt(
                divan::black_box(&file_key),
                divan::black_box(&nonce),
                divan::black_box(&encrypted),
            )
            .unwrap()
        });
}

#[divan::bench(args = [1, 4, 16])]
fn bench_x25519_message(bencher: divan::Bencher, recipients: usize) {
    let identities: Vec<x25519::Identity> = (0..recipients).map(|_| x25519::Identity::generate()).collect();
    let last = IdentityKey::X25519(identities[recipients - 1].clone());
    let data = make_data(4096);
    bencher.bench(|| {
        let encryptor = Encryptor::with_recipients(
            identities
                .iter()
                .map(|i| Recipient::X25519(i.to_public()))
                .collect(),
        )
        .unwrap();
        let message = encryptor.encrypt(divan::black_box(&data)).unwrap();
        Decryptor::new(&message).unwrap().decrypt([&last]).unwrap()
    });
}

fn main() {
    divan::main();
}
