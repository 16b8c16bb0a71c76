// Settlement Tests
// Claims against the token allocation and owner withdrawals

use spacecoin::account::units::{parse_units, whole};
use spacecoin::account::Address;
use spacecoin::crowdsale::{Crowdsale, CrowdsaleConfig, CrowdsaleError, Stage};
use spacecoin::token::{TokenConfig, TokenError, TokenLedger};

struct Fixture {
    sale: Crowdsale,
    token: TokenLedger,
    owner: Address,
    treasury: Address,
}

fn setup() -> Fixture {
    setup_with_allocation(whole(150_000))
}

fn setup_with_allocation(allocation: u128) -> Fixture {
    let owner = Address::from_label("owner");
    let treasury = Address::from_label("treasury");
    let ico = Address::from_label("ico");

    let mut token = TokenLedger::new(owner, treasury, &TokenConfig::default()).unwrap();
    token.transfer(owner, ico, allocation).unwrap();

    let sale = Crowdsale::new(ico, owner, [owner], CrowdsaleConfig::default()).unwrap();
    Fixture {
        sale,
        token,
        owner,
        treasury,
    }
}

fn eth(s: &str) -> u128 {
    parse_units(s).unwrap()
}

// ============================================================================
// CLAIMS
// ============================================================================

#[test]
fn test_claim_before_open_fails() {
    let mut f = setup();
    f.sale.buy_tokens(f.owner, whole(10)).unwrap();

    assert_eq!(
        f.sale.claim_token(f.owner, &mut f.token).unwrap_err(),
        CrowdsaleError::WrongStageForClaim { stage: Stage::Seed }
    );

    f.sale.advance_stage(f.owner, Stage::General).unwrap();
    assert_eq!(
        f.sale.claim_token(f.owner, &mut f.token).unwrap_err(),
        CrowdsaleError::WrongStageForClaim { stage: Stage::General }
    );
}

#[test]
fn test_claim_pays_five_tokens_per_unit() {
    let mut f = setup();
    let addr1 = Address::from_label("addr1");
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(addr1, whole(20)).unwrap();

    assert_eq!(f.sale.claimable(&addr1), whole(100));

    let claim = f.sale.claim_token(addr1, &mut f.token).unwrap();

    assert_eq!(claim.redeemed, whole(20));
    assert_eq!(claim.tokens, whole(100));
    assert!(!claim.split.is_taxed());
    assert_eq!(f.token.balance_of(&addr1), whole(100));
    assert_eq!(f.token.balance_of(&f.sale.address()), whole(150_000) - whole(100));
}

#[test]
fn test_fractional_contribution_claims_exact_multiple() {
    let mut f = setup();
    let addr1 = Address::from_label("addr1");
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(addr1, eth("0.3")).unwrap();

    let claim = f.sale.claim_token(addr1, &mut f.token).unwrap();
    assert_eq!(claim.tokens, eth("1.5"));
}

#[test]
fn test_second_claim_has_nothing_to_claim() {
    let mut f = setup();
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(f.owner, whole(1)).unwrap();
    f.sale.claim_token(f.owner, &mut f.token).unwrap();

    assert_eq!(
        f.sale.claim_token(f.owner, &mut f.token).unwrap_err(),
        CrowdsaleError::NothingToClaim
    );
    assert_eq!(f.sale.claimable(&f.owner), 0);
}

#[test]
fn test_non_contributor_has_nothing_to_claim() {
    let mut f = setup();
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();

    let stranger = Address::from_label("stranger");
    assert_eq!(
        f.sale.claim_token(stranger, &mut f.token).unwrap_err(),
        CrowdsaleError::NothingToClaim
    );
}

#[test]
fn test_claim_after_further_contribution_pays_only_the_new_part() {
    let mut f = setup();
    let addr1 = Address::from_label("addr1");
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();

    f.sale.buy_tokens(addr1, whole(2)).unwrap();
    f.sale.claim_token(addr1, &mut f.token).unwrap();

    f.sale.buy_tokens(addr1, whole(3)).unwrap();
    assert_eq!(f.sale.unredeemed(&addr1), whole(3));

    let claim = f.sale.claim_token(addr1, &mut f.token).unwrap();
    assert_eq!(claim.redeemed, whole(3));
    assert_eq!(f.token.balance_of(&addr1), whole(25));
}

#[test]
fn test_seed_contributions_are_claimable_in_open() {
    let mut f = setup();
    f.sale.buy_tokens(f.owner, whole(1_500)).unwrap();
    f.sale.advance_stage(f.owner, Stage::General).unwrap();
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();

    let claim = f.sale.claim_token(f.owner, &mut f.token).unwrap();
    assert_eq!(claim.tokens, whole(7_500));
}

#[test]
fn test_claim_is_taxed_when_tax_enabled() {
    let mut f = setup();
    let addr1 = Address::from_label("addr1");
    f.token.toggle_take_fee(f.owner).unwrap();
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(addr1, whole(10)).unwrap();

    let treasury_before = f.token.balance_of(&f.treasury);
    let claim = f.sale.claim_token(addr1, &mut f.token).unwrap();

    assert_eq!(claim.tokens, whole(50));
    assert_eq!(claim.split.to_treasury, whole(1));
    assert_eq!(claim.split.to_recipient, whole(49));
    assert_eq!(f.token.balance_of(&addr1), whole(49));
    assert_eq!(f.token.balance_of(&f.treasury), treasury_before + whole(1));
}

#[test]
fn test_underfunded_claim_keeps_entitlement() {
    let mut f = setup_with_allocation(whole(10));
    let addr1 = Address::from_label("addr1");
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(addr1, whole(3)).unwrap();

    let err = f.sale.claim_token(addr1, &mut f.token).unwrap_err();
    assert_eq!(
        err,
        CrowdsaleError::Token(TokenError::InsufficientBalance {
            available: whole(10),
            required: whole(15),
        })
    );
    assert_eq!(f.sale.unredeemed(&addr1), whole(3));
    assert_eq!(f.token.balance_of(&addr1), 0);

    // Topping up the allocation makes the same claim succeed
    f.token.transfer(f.owner, f.sale.address(), whole(5)).unwrap();
    let claim = f.sale.claim_token(addr1, &mut f.token).unwrap();
    assert_eq!(claim.tokens, whole(15));
}

// ============================================================================
// WITHDRAWALS
// ============================================================================

#[test]
fn test_only_owner_can_withdraw() {
    let mut f = setup();
    let addr1 = Address::from_label("addr1");
    f.sale.add_to_whitelist(f.owner, &[addr1]).unwrap();
    f.sale.buy_tokens(addr1, whole(100)).unwrap();

    assert_eq!(f.sale.withdraw_funds(addr1).unwrap_err(), CrowdsaleError::NotOwner);
    assert_eq!(f.sale.available_funds_to_withdraw(), whole(100));
}

#[test]
fn test_withdraw_releases_everything_raised() {
    let mut f = setup();
    f.sale.buy_tokens(f.owner, whole(100)).unwrap();

    assert_eq!(f.sale.withdraw_funds(f.owner).unwrap(), whole(100));
    assert_eq!(f.sale.available_funds_to_withdraw(), 0);
    assert_eq!(f.sale.total_raised(), whole(100));
}

#[test]
fn test_withdraw_with_nothing_available_fails() {
    let mut f = setup();
    assert_eq!(
        f.sale.withdraw_funds(f.owner).unwrap_err(),
        CrowdsaleError::NoFundsAvailable
    );

    f.sale.buy_tokens(f.owner, whole(1)).unwrap();
    f.sale.withdraw_funds(f.owner).unwrap();
    assert_eq!(
        f.sale.withdraw_funds(f.owner).unwrap_err(),
        CrowdsaleError::NoFundsAvailable
    );
}

#[test]
fn test_withdraw_only_pays_new_contributions() {
    let mut f = setup();
    f.sale.buy_tokens(f.owner, whole(100)).unwrap();
    f.sale.withdraw_funds(f.owner).unwrap();

    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(Address::from_label("late"), whole(40)).unwrap();

    assert_eq!(f.sale.withdraw_funds(f.owner).unwrap(), whole(40));
}

#[test]
fn test_withdraw_does_not_affect_claims() {
    let mut f = setup();
    f.sale.advance_stage(f.owner, Stage::Open).unwrap();
    f.sale.buy_tokens(f.owner, whole(4)).unwrap();
    f.sale.withdraw_funds(f.owner).unwrap();

    let claim = f.sale.claim_token(f.owner, &mut f.token).unwrap();
    assert_eq!(claim.tokens, whole(20));
}
