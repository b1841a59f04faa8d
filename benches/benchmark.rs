use benchmark_simple::*;
use jwt_crypto::prelude::*;

fn main() {
    let bench = Bench::new();

    let options = &Options {
        iterations: 1000,
        warmup_iterations: 100,
        min_samples: 5,
        max_samples: 10,
        max_rsd: 1.0,
        ..Default::default()
    };

    let key = [0x42u8; 32];
    for strategy in [AesStrategy::Portable, AesStrategy::Accelerated] {
        let cipher = AesBlockCipher::with_strategy(&key, strategy).unwrap();
        let res = bench.run(options, || {
            let mut block = [0u8; 16];
            for _ in 0..1024 {
                cipher.encrypt_block(&mut block);
            }
            block
        });
        println!("aes-256 {:?} - block: {}", strategy, res.throughput(16 * 1024));
    }

    let plaintext = vec![0u8; 16384];
    for enc in [
        EncryptionAlgorithm::A128CBC_HS256,
        EncryptionAlgorithm::A256CBC_HS512,
        EncryptionAlgorithm::A256GCM,
    ] {
        let cek = enc.generate_cek();
        let encryptor = AuthenticatedEncryptor::new(cek.as_bytes(), enc).unwrap();
        let nonce = encryptor.generate_nonce();
        let res = bench.run(options, || {
            encryptor.encrypt(&nonce, b"header", &plaintext).unwrap()
        });
        println!(
            "{} - encrypt: {}",
            enc.name(),
            res.throughput(plaintext.len() as _)
        );
    }

    let message = b"eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJiZW5jaCJ9";
    for (key, alg) in [
        (
            Jwk::Symmetric(SymmetricKey::generate(256).unwrap()),
            SignatureAlgorithm::HS256,
        ),
        (
            Jwk::Rsa(RsaKeyParameters::generate(2048).unwrap()),
            SignatureAlgorithm::RS256,
        ),
        (
            Jwk::Ec(EcKeyParameters::generate(EllipticCurve::P256).unwrap()),
            SignatureAlgorithm::ES256,
        ),
    ] {
        let signer = Signer::new(&key, alg, true).unwrap();
        let signature = signer.sign(message).unwrap();
        let res = bench.run(options, || signer.sign(message).unwrap());
        println!("{} - sign: {}", alg.name(), res.throughput(1));
        let res = bench.run(options, || signer.verify(message, &signature).unwrap());
        println!("{} - verify: {}", alg.name(), res.throughput(1));
    }
}
