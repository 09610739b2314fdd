//! BIP143 sighash over a two-input, two-output witness transaction

use spv_proof::sighash::{bip143_sighash, p2wpkh_script_code};
use spv_proof::*;

const TX: &str = "01000000000102fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa8e47ecb8ae4bf38b7cae4e8d3e0c8c8c9e90100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac000011000000";
const SCRIPT_CODE: &str = "76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac";
const VALUE: u64 = 600_000_000;

fn sighash_input_1(flag: SighashFlag) -> Result<SighashResult> {
    let tx = hex::decode(TX).unwrap();
    let script = hex::decode(SCRIPT_CODE).unwrap();
    bip143_sighash(&tx, 1, flag, &script, VALUE)
}

#[test]
fn test_sighash_all_digest() {
    let result = sighash_input_1(SighashFlag::ALL).unwrap();
    assert_eq!(
        hex::encode(result.digest),
        "2d9369aad80513dcb66198230b3ee7adbade5d1d80c7787f633e0f6ab73e1c29"
    );
    assert_eq!(result.sighash_flag, 0x01);
}

/// Assembles the preimage by hand from the BIP143 native P2WPKH intermediate hashes
fn assembled_preimage(hash_prevouts: &[u8], hash_sequence: &[u8], hash_outputs: &[u8], flag: u32) -> Vec<u8> {
    let tx = hex::decode(TX).unwrap();
    let mut preimage = vec![1, 0, 0, 0];
    preimage.extend_from_slice(hash_prevouts);
    preimage.extend_from_slice(hash_sequence);
    preimage.extend_from_slice(&tx[48..84]);
    preimage.push(0x19);
    preimage.extend_from_slice(&hex::decode(SCRIPT_CODE).unwrap());
    preimage.extend_from_slice(&VALUE.to_le_bytes());
    preimage.extend_from_slice(&[0xff; 4]);
    preimage.extend_from_slice(hash_outputs);
    preimage.extend_from_slice(&17u32.to_le_bytes());
    preimage.extend_from_slice(&flag.to_le_bytes());
    preimage
}

#[test]
fn test_digest_matches_published_components() {
    let tx = hex::decode(TX).unwrap();
    let outpoints = [&tx[7..43], &tx[48..84]].concat();
    let hash_prevouts = hash::hash256(&outpoints);
    let hash_sequence =
        hex::decode("52b0a642eea2fb7ae638c36f6252b6750293dbe574a806984b8e4d8548339a3b").unwrap();
    let hash_outputs =
        hex::decode("863ef3e1a92afbfdb97f31ad0fc7683ee943e9abcf2501590ff8f6551f47e5e5").unwrap();

    let all = assembled_preimage(&hash_prevouts, &hash_sequence, &hash_outputs, 0x01);
    assert_eq!(sighash_input_1(SighashFlag::ALL).unwrap().digest, hash::hash256(&all));

    // ANYONECANPAY drops both input commitments and keeps hashOutputs
    let acp = assembled_preimage(&[0; 32], &[0; 32], &hash_outputs, 0x81);
    assert_eq!(
        sighash_input_1(SighashFlag::ALL_ANYONECANPAY).unwrap().digest,
        hash::hash256(&acp)
    );
}

#[test]
fn test_anyone_can_pay_changes_digest() {
    let all = sighash_input_1(SighashFlag::ALL).unwrap();
    let acp = sighash_input_1(SighashFlag::ALL_ANYONECANPAY).unwrap();
    assert_ne!(all.digest, acp.digest);
    assert_eq!(
        hex::encode(acp.digest),
        "b97b03fded2586b962c684220474a3a6bb5d4c9d6188054cd5cd80cce3a27bd0"
    );
    assert_eq!(acp.sighash_flag, 0x81);
    assert!(acp.updateable_inputs);
    assert!(!acp.updateable_outputs);
}

#[test]
fn test_single_with_missing_output() {
    // Three inputs, two outputs: SINGLE on input 2 commits to no outputs
    let tx = hex::decode(TX).unwrap();
    let mut three = tx[..6].to_vec();
    three.push(0x03);
    three.extend_from_slice(&tx[7..89]);
    three.extend_from_slice(&tx[7..48]);
    three.extend_from_slice(&tx[89..]);

    let script = hex::decode(SCRIPT_CODE).unwrap();
    let single = bip143_sighash(&three, 2, SighashFlag::SINGLE, &script, VALUE).unwrap();
    let none = bip143_sighash(&three, 2, SighashFlag::NONE, &script, VALUE).unwrap();
    // Same preimage apart from the sighash type field
    assert_ne!(single.digest, none.digest);
    assert!(single.updateable_outputs);

    let single_in_range = bip143_sighash(&three, 1, SighashFlag::SINGLE, &script, VALUE).unwrap();
    assert_ne!(single_in_range.digest, single.digest);
}

#[test]
fn test_malformed_transaction() {
    let tx = hex::decode(TX).unwrap();
    assert_eq!(
        bip143_sighash(&tx[..100], 0, SighashFlag::ALL, &[], 0),
        Err(SpvError::MalformedVout)
    );
    assert_eq!(
        bip143_sighash(&tx[..60], 0, SighashFlag::ALL, &[], 0),
        Err(SpvError::MalformedVin)
    );
    assert_eq!(
        bip143_sighash(&tx, 9, SighashFlag::ALL, &[], 0),
        Err(SpvError::InputIndexOutOfRange { index: 9, count: 2 })
    );
}

#[test]
fn test_script_code_helper() {
    let pubkey = hex::decode("025476c2e83188368da1ff3e292e7acafcdb3576d16db12c6d4c0e2c1e94a3fe9f").unwrap();
    let script = p2wpkh_script_code(&pubkey);
    assert_eq!(script.len(), 25);
    assert_eq!(&script[3..23], hash::hash160(&pubkey).as_slice());

    let tx = hex::decode(TX).unwrap();
    let result = bip143_sighash(&tx, 0, SighashFlag::ALL, &script, 1).unwrap();
    assert_eq!(result.digest.len(), 32);
}
