pub fn command_keygen(_matches: &clap::ArgMatches) {
    let (secret, public) = homoballot::generate_keypair();
    let (secret, public) = (
        hex::encode(secret.to_bytes()),
        hex::encode(public.to_bytes()),
    );

    println!("secret-key: {}", secret);
    println!("public-key: {}", public);
}

pub fn command_paillier_keygen(_matches: &clap::ArgMatches, config: &crate::Config) {
    let mut rng = rand::rngs::OsRng;
    let (public, _private) = homoballot::keygen(config.key_bits, &mut rng).unwrap_or_else(|e| {
        eprintln!("homoballot paillier-keygen: {}", e);
        std::process::exit(1);
    });

    match serde_json::to_string_pretty(&public) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("homoballot paillier-keygen: unable to encode public key: {}", e);
            std::process::exit(1);
        }
    }
}
