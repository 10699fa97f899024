//! Ledger integration tests
//!
//! End-to-end scenarios across wallets, miners and a shared ledger: genesis
//! funding, transfers, guest block ingestion, replay rejection and fork
//! choice.

use std::sync::Arc;
use utxo_chain::config::LedgerConfig;
use utxo_chain::core::{Block, Blockchain, Transaction, Utxo, TRANSACTION_FEE};
use utxo_chain::error::LedgerError;
use utxo_chain::utils::KeyPair;
use utxo_chain::wallet::{Miner, Wallet};

const TEST_DIFFICULTY: u32 = 6;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config() -> LedgerConfig {
    LedgerConfig::default().with_difficulty(TEST_DIFFICULTY)
}

/// Genesis block funding its miner from two hand-made inputs of 10001 and 10000
fn funded_genesis(keys: &KeyPair, miner: &Miner) -> Block {
    let me = keys.public_key();
    let inputs = vec![
        Utxo::new("0", me, me, 10001).unwrap(),
        Utxo::new("0", me, me, 10000).unwrap(),
    ];
    let mut funding = Transaction::new_single(me, me, 10000, inputs).unwrap();
    funding.prepare_outputs(TRANSACTION_FEE).unwrap();
    funding.sign(keys).unwrap();

    let mut genesis = Block::new_genesis(TEST_DIFFICULTY, me).unwrap();
    miner.add_transaction(funding, &mut genesis).unwrap();
    miner.mine_block(&mut genesis).unwrap();
    genesis
}

/// A valid ledger of `len` blocks whose genesis is mined by `miner`
fn chain_of(keys: &KeyPair, miner: &Miner, len: usize) -> Arc<Blockchain> {
    let ledger = Arc::new(Blockchain::with_config(
        funded_genesis(keys, miner),
        test_config(),
    ));
    while ledger.len() < len {
        let mut block = miner.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
        miner.generate_reward_transaction(&mut block).unwrap();
        miner.mine_block(&mut block).unwrap();
        ledger.append(block).unwrap();
    }
    ledger
}

fn genesis_actor(name: &str) -> (KeyPair, Miner) {
    let keys = KeyPair::generate().unwrap();
    let miner = Miner::from_key_pair(name, keys.clone());
    (keys, miner)
}

#[test]
fn test_genesis_funding_and_balance() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");

    let genesis = funded_genesis(&keys, &genesis_miner);
    let funding = &genesis.get_transactions()[0];
    let change: Vec<u64> = funding.get_outputs().iter().map(|o| o.get_amount()).collect();
    assert_eq!(change, vec![10000, 10000]);

    let ledger = Arc::new(Blockchain::with_config(genesis, test_config()));
    genesis_miner
        .wallet()
        .set_local_ledger(Arc::clone(&ledger))
        .unwrap();

    assert!(ledger.is_valid());
    // 10001 + 10000 in, 1 fee reissued to no one
    assert_eq!(genesis_miner.wallet().current_balance(&ledger), 20000);
}

#[test]
fn test_empty_wallet_cannot_transfer() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let wallet = Wallet::new("wallet A").unwrap();
    wallet.set_local_ledger(ledger).unwrap();

    let result = wallet.transfer_fund_to(genesis_miner.public_key(), 10);
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientFunds { available: 0, .. })
    ));
}

#[test]
fn test_transfer_mine_and_ingest() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let miner_a = Miner::new("miner A").unwrap();
    let wallet_b = Wallet::new("wallet B").unwrap();
    for wallet in [genesis_miner.wallet(), miner_a.wallet(), &wallet_b] {
        wallet.set_local_ledger(Arc::clone(&ledger)).unwrap();
    }

    let payment = genesis_miner
        .wallet()
        .transfer_fund(
            &[miner_a.public_key().clone(), wallet_b.public_key().clone()],
            &[100, 200],
        )
        .unwrap();

    let mut block = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    miner_a.add_transaction(payment, &mut block).unwrap();
    miner_a.generate_reward_transaction(&mut block).unwrap();
    miner_a.mine_block(&mut block).unwrap();

    wallet_b.update_local_ledger_with_block(block).unwrap();

    // Every actor shares the same ledger, so all of them see the new block
    assert_eq!(ledger.len(), 2);
    assert!(Blockchain::validate_deep(&ledger).is_ok());

    let genesis_balance = genesis_miner.wallet().current_balance(&ledger);
    let a_balance = miner_a.wallet().current_balance(&ledger);
    let b_balance = wallet_b.current_balance(&ledger);
    assert_eq!(genesis_balance, 20000 - 300 - 1);
    assert_eq!(a_balance, 100 + 100 + 1);
    assert_eq!(b_balance, 200);
    // Genesis inputs plus one mining reward, minus the genesis fee; the
    // block's transfer fee is reissued to miner A through the reward
    assert_eq!(genesis_balance + a_balance + b_balance, 20000 + 100);

    let summary = ledger.find_related_utxos(miner_a.public_key());
    assert_eq!(summary.get_rewards().len(), 1);
    assert_eq!(summary.get_unspent().len(), 2);
}

#[test]
fn test_replayed_transaction_is_rejected() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let miner_a = Miner::new("miner A").unwrap();
    let wallet_b = Wallet::new("wallet B").unwrap();
    for wallet in [genesis_miner.wallet(), miner_a.wallet(), &wallet_b] {
        wallet.set_local_ledger(Arc::clone(&ledger)).unwrap();
    }

    let payment = genesis_miner
        .wallet()
        .transfer_fund_to(wallet_b.public_key(), 50)
        .unwrap();
    let mut first = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    miner_a.add_transaction(payment.clone(), &mut first).unwrap();
    miner_a.mine_block(&mut first).unwrap();
    wallet_b.update_local_ledger_with_block(first).unwrap();
    assert!(ledger.transaction_exists(&payment));

    // The miner's own check refuses the replay outright
    let mut second = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    assert_eq!(
        miner_a
            .add_transaction(payment.clone(), &mut second)
            .unwrap_err(),
        LedgerError::DuplicateTransaction(payment.get_id().to_string())
    );

    // A block that slips the replay in anyway is refused at ingestion
    second
        .add_transaction(payment.clone(), miner_a.public_key())
        .unwrap();
    miner_a.mine_block(&mut second).unwrap();
    assert!(matches!(
        wallet_b.update_local_ledger_with_block(second),
        Err(LedgerError::DuplicateTransaction(_))
    ));
    assert_eq!(ledger.len(), 2);
    assert_eq!(wallet_b.current_balance(&ledger), 50);
}

#[test]
fn test_guest_block_checks() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 2);
    let miner_a = Miner::new("miner A").unwrap();
    miner_a
        .wallet()
        .set_local_ledger(Arc::clone(&ledger))
        .unwrap();

    // Built on the genesis block instead of the tip
    let genesis_hash = ledger.genesis_block().get_hash().to_string();
    let mut stale = Block::new(&genesis_hash, TEST_DIFFICULTY, miner_a.public_key()).unwrap();
    miner_a.mine_block(&mut stale).unwrap();
    assert!(matches!(
        miner_a.wallet().verify_guest_block(&stale, &ledger),
        Err(LedgerError::BrokenLink { .. })
    ));

    // Mined but never signed
    let mut unsigned = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    unsigned.mine(miner_a.public_key()).unwrap();
    assert!(matches!(
        miner_a.wallet().verify_guest_block(&unsigned, &ledger),
        Err(LedgerError::Validation(_))
    ));

    // Reward transaction never signed
    let me = miner_a.public_key();
    let mut careless = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    let mut reward = Transaction::new_single(me, me, 100, vec![]).unwrap();
    let output = Utxo::new_reward(reward.get_id(), me, me, 100).unwrap();
    reward.add_output(output);
    careless.set_reward_transaction(Some(reward), me).unwrap();
    miner_a.mine_block(&mut careless).unwrap();
    assert_eq!(
        miner_a.wallet().update_local_ledger_with_block(careless),
        Err(LedgerError::InvalidSignature)
    );
    assert_eq!(ledger.len(), 2);
}

#[test]
fn test_block_below_ledger_difficulty_is_rejected() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let (miner_keys, miner_a) = genesis_actor("miner A");
    miner_a
        .wallet()
        .set_local_ledger(Arc::clone(&ledger))
        .unwrap();

    assert!(matches!(
        miner_a.create_new_block(&ledger, 0),
        Err(LedgerError::Config(_))
    ));
    assert!(matches!(
        miner_a.create_new_block(&ledger, 300),
        Err(LedgerError::Config(_))
    ));

    // Built by hand so the miner's own guard is bypassed
    let me = miner_a.public_key();
    let mut easy = Block::new(ledger.last_block().get_hash(), 0, me).unwrap();
    easy.mine(me).unwrap();
    let signature = miner_keys.sign(easy.get_hash().as_bytes()).unwrap();
    easy.sign(me, signature).unwrap();

    assert!(matches!(
        miner_a.wallet().update_local_ledger_with_block(easy),
        Err(LedgerError::Validation(_))
    ));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_over_rewarded_block_is_rejected() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let (miner_keys, miner_a) = genesis_actor("miner A");
    miner_a
        .wallet()
        .set_local_ledger(Arc::clone(&ledger))
        .unwrap();

    let me = miner_a.public_key();
    let mut block = miner_a.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
    let mut reward = Transaction::new_single(me, me, 5000, vec![]).unwrap();
    let output = Utxo::new_reward(reward.get_id(), me, me, 5000).unwrap();
    reward.add_output(output);
    reward.sign(&miner_keys).unwrap();
    block.set_reward_transaction(Some(reward), me).unwrap();
    miner_a.mine_block(&mut block).unwrap();

    assert_eq!(
        miner_a.wallet().verify_guest_block(&block, &ledger),
        Err(LedgerError::OverReward {
            allowed: 100,
            claimed: 5000
        })
    );
}

#[test]
fn test_longer_chain_is_adopted() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let l1 = chain_of(&keys, &genesis_miner, 3);
    let l2 = chain_of(&keys, &genesis_miner, 5);
    let l3 = chain_of(&keys, &genesis_miner, 2);

    let wallet = Wallet::new("observer").unwrap();
    wallet.set_local_ledger(Arc::clone(&l1)).unwrap();

    wallet.set_local_ledger(Arc::clone(&l2)).unwrap();
    assert!(Arc::ptr_eq(&wallet.local_ledger().unwrap(), &l2));

    let other = Wallet::new("other observer").unwrap();
    other.set_local_ledger(Arc::clone(&l1)).unwrap();
    assert_eq!(
        other.set_local_ledger(l3).unwrap_err(),
        LedgerError::ShorterChain {
            local: 3,
            incoming: 2
        }
    );
    assert!(Arc::ptr_eq(&other.local_ledger().unwrap(), &l1));
}

#[test]
fn test_foreign_genesis_is_rejected() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let (rival_keys, rival) = genesis_actor("rival");
    let ours = chain_of(&keys, &genesis_miner, 2);
    let theirs = chain_of(&rival_keys, &rival, 4);

    let wallet = Wallet::new("observer").unwrap();
    wallet.set_local_ledger(Arc::clone(&ours)).unwrap();
    assert_eq!(
        wallet.set_local_ledger(Arc::clone(&theirs)).unwrap_err(),
        LedgerError::GenesisMismatch
    );
    assert!(!wallet.update_local_ledger(&[theirs]));
    assert!(Arc::ptr_eq(&wallet.local_ledger().unwrap(), &ours));
}

#[test]
fn test_update_local_ledger_picks_longest() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let short = chain_of(&keys, &genesis_miner, 2);
    let long = chain_of(&keys, &genesis_miner, 4);
    let medium = chain_of(&keys, &genesis_miner, 3);

    let wallet = Wallet::new("observer").unwrap();
    assert!(!wallet.update_local_ledger(&[]));
    assert!(wallet.update_local_ledger(&[
        Arc::clone(&short),
        Arc::clone(&long),
        Arc::clone(&medium)
    ]));
    assert!(Arc::ptr_eq(&wallet.local_ledger().unwrap(), &long));

    // Nothing longer on offer: the local ledger stays
    assert!(!wallet.update_local_ledger(&[short, medium]));
    assert_eq!(wallet.local_ledger().unwrap().len(), 4);
}

#[test]
fn test_configured_fee_is_charged() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let config = LedgerConfig::from_toml_str("transaction_fee = 3\nmining_reward = 50\ndifficulty = 6")
        .unwrap();
    let ledger = Arc::new(Blockchain::with_config(
        funded_genesis(&keys, &genesis_miner),
        config,
    ));
    genesis_miner
        .wallet()
        .set_local_ledger(Arc::clone(&ledger))
        .unwrap();
    let receiver = Wallet::new("receiver").unwrap();

    let payment = genesis_miner
        .wallet()
        .transfer_fund_to(receiver.public_key(), 10)
        .unwrap();
    let change = payment.get_outputs()[1].get_amount();
    assert_eq!(change, 10000 - 10 - 3);

    let mut block = genesis_miner
        .create_new_block(&ledger, TEST_DIFFICULTY)
        .unwrap();
    genesis_miner.add_transaction(payment, &mut block).unwrap();
    genesis_miner.generate_reward_transaction(&mut block).unwrap();
    assert_eq!(block.get_reward_amount(), 50 + 3);
}

#[test]
fn test_racing_blocks_only_one_is_appended() {
    init_logging();
    let (keys, genesis_miner) = genesis_actor("genesis");
    let ledger = chain_of(&keys, &genesis_miner, 1);
    let miners: Vec<Miner> = (0..4)
        .map(|i| Miner::new(&format!("miner {i}")).unwrap())
        .collect();

    let blocks: Vec<Block> = miners
        .iter()
        .map(|miner| {
            miner.wallet().set_local_ledger(Arc::clone(&ledger)).unwrap();
            let mut block = miner.create_new_block(&ledger, TEST_DIFFICULTY).unwrap();
            miner.mine_block(&mut block).unwrap();
            block
        })
        .collect();

    let accepted = std::thread::scope(|scope| {
        let handles: Vec<_> = miners
            .iter()
            .zip(blocks)
            .map(|(miner, block)| {
                scope.spawn(move || miner.wallet().update_local_ledger_with_block(block).is_ok())
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(accepted, 1);
    assert_eq!(ledger.len(), 2);
    assert!(ledger.is_valid());
}
