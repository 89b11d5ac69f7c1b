//! Token-2022 mint creation with on-chain metadata.
//!
//! Two envelopes, strictly sequenced:
//!
//! 1. create the mint account, initialize the metadata pointer, initialize the
//!    mint, initialize metadata. The freshly generated mint key co-signs.
//! 2. create the owner's associated token account, mint the initial supply.
//!
//! Envelope 2 is only built once envelope 1 has been confirmed.

use std::fmt;

use log::{debug, info};
use sol_tx::token::{self, mint_len_with_metadata_pointer, token_base_units};
use sol_tx::{
    derive_associated_token_address, system, Address, Instruction, Keypair, Signature,
    TokenMetadata, Transaction, TOKEN_2022_PROGRAM_ID,
};

use crate::error::{ToolkitError, ValidationError};
use crate::session::Session;

pub const MIN_DECIMALS: u8 = 1;
pub const MAX_DECIMALS: u8 = 9;
pub const DEFAULT_DECIMALS: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens minted to the creator.
    pub supply: u64,
    /// Metadata URI. Blank or `None` falls back to the configured default.
    pub uri: Option<String>,
}

impl MintParams {
    /// Checks decimals and supply, returning the supply in base units.
    pub fn validate(&self) -> Result<u64, ValidationError> {
        if !(MIN_DECIMALS..=MAX_DECIMALS).contains(&self.decimals) {
            return Err(ValidationError::DecimalsOutOfRange(self.decimals));
        }
        if self.supply == 0 {
            return Err(ValidationError::NonPositiveSupply);
        }
        token_base_units(self.supply, self.decimals)
            .map_err(|e| ValidationError::SupplyOverflow(e.to_string()))
    }

    fn resolved_uri(&self, default: &str) -> String {
        match self.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => uri.to_string(),
            _ => default.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReceipt {
    pub mint: Address,
    pub associated_account: Address,
    pub decimals: u8,
    /// Supply minted, in base units.
    pub base_units: u64,
    pub mint_signature: Signature,
    pub distribution_signature: Signature,
}

impl fmt::Display for TokenReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token created successfully! Mint: {}", self.mint)
    }
}

/// Envelope 1. `space` is the mint account size; `lamports` must cover the
/// account once metadata has been written into it.
pub fn mint_instructions(
    payer: &Address,
    metadata: &TokenMetadata,
    decimals: u8,
    lamports: u64,
) -> Vec<Instruction> {
    let mint = &metadata.mint;
    let space = mint_len_with_metadata_pointer() as u64;

    vec![
        system::create_account(payer, mint, lamports, space, &TOKEN_2022_PROGRAM_ID),
        token::initialize_metadata_pointer(mint, Some(payer), Some(mint)),
        token::initialize_mint(&TOKEN_2022_PROGRAM_ID, mint, decimals, payer, None),
        token::initialize_metadata(&TOKEN_2022_PROGRAM_ID, metadata, payer),
    ]
}

/// Envelope 2.
pub fn distribution_instructions(
    owner: &Address,
    mint: &Address,
    associated_account: &Address,
    base_units: u64,
    idempotent: bool,
) -> Vec<Instruction> {
    vec![
        token::create_associated_token_account(
            owner,
            associated_account,
            owner,
            mint,
            &TOKEN_2022_PROGRAM_ID,
            idempotent,
        ),
        token::mint_to(
            &TOKEN_2022_PROGRAM_ID,
            mint,
            associated_account,
            owner,
            base_units,
        ),
    ]
}

/// Create a Token-2022 mint with metadata and mint the initial supply to the
/// connected wallet.
pub async fn create_token(
    session: &Session,
    params: MintParams,
) -> Result<TokenReceipt, ToolkitError> {
    let owner = session.owner()?;
    let base_units = params.validate()?;
    let config = session.config();
    let gateway = session.gateway();
    let wallet = session.wallet();

    let mint = Keypair::generate();
    let mint_address = mint.address();
    let metadata = TokenMetadata {
        update_authority: owner,
        mint: mint_address,
        name: params.name.clone(),
        symbol: params.symbol.clone(),
        uri: params.resolved_uri(&config.default_metadata_uri),
        additional_metadata: Vec::new(),
    };

    let funded_len = mint_len_with_metadata_pointer() + metadata.tlv_len();
    let rent = gateway
        .get_minimum_balance_for_rent_exemption(funded_len)
        .await?;
    debug!("Mint {mint_address}: {funded_len} bytes, {rent} lamports rent");

    let mut envelope = Transaction::new(mint_instructions(
        &owner,
        &metadata,
        params.decimals,
        rent,
    ));
    envelope.bind(owner, gateway.get_latest_blockhash().await?);
    envelope.partial_sign(&mint)?;

    let mint_signature = wallet.sign_and_submit(envelope, gateway).await?;
    info!("Mint {mint_address} submitted: {mint_signature}");

    if !gateway.confirm_transaction(&mint_signature).await? {
        return Err(ToolkitError::Transport(format!(
            "Mint transaction {mint_signature} was not confirmed within {}s",
            config.confirm_timeout.as_secs()
        )));
    }

    let associated_account =
        derive_associated_token_address(&owner, &mint_address, &TOKEN_2022_PROGRAM_ID)?;
    let mut distribution = Transaction::new(distribution_instructions(
        &owner,
        &mint_address,
        &associated_account,
        base_units,
        config.idempotent_associated_account,
    ));
    distribution.bind(owner, gateway.get_latest_blockhash().await?);

    let distribution_signature = wallet.sign_and_submit(distribution, gateway).await?;
    info!(
        "Minted {base_units} base units of {mint_address} to {associated_account}: \
         {distribution_signature}"
    );

    Ok(TokenReceipt {
        mint: mint_address,
        associated_account,
        decimals: params.decimals,
        base_units,
        mint_signature,
        distribution_signature,
    })
}

/// Editable token-creation inputs as a front-end holds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenForm {
    pub name: String,
    pub symbol: String,
    pub image_url: String,
    pub decimals: u8,
    pub supply: u64,
}

impl Default for TokenForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            symbol: String::new(),
            image_url: String::new(),
            decimals: DEFAULT_DECIMALS,
            supply: 0,
        }
    }
}

impl TokenForm {
    pub fn to_params(&self) -> MintParams {
        MintParams {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            supply: self.supply,
            uri: Some(self.image_url.clone()),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run [`create_token`] from form inputs. The form is cleared once the
/// workflow finishes, whatever the outcome.
pub async fn create_token_from_form(
    session: &Session,
    form: &mut TokenForm,
) -> Result<TokenReceipt, ToolkitError> {
    let outcome = create_token(session, form.to_params()).await;
    form.reset();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_METADATA_URI;
    use crate::error::ReasonCode;
    use crate::gateway::{GatewayError, MockGateway};
    use crate::ops::testing;
    use mockall::Sequence;
    use sol_tx::{Blockhash, ASSOCIATED_TOKEN_PROGRAM_ID};
    use std::sync::{Arc, Mutex};

    const RENT: u64 = 3_118_080;

    fn params(decimals: u8, supply: u64) -> MintParams {
        MintParams {
            name: "Test".into(),
            symbol: "TST".into(),
            decimals,
            supply,
            uri: None,
        }
    }

    fn expected_funded_len(uri: &str) -> usize {
        let metadata = TokenMetadata {
            update_authority: Address::default(),
            mint: Address::default(),
            name: "Test".into(),
            symbol: "TST".into(),
            uri: uri.into(),
            additional_metadata: Vec::new(),
        };
        mint_len_with_metadata_pointer() + metadata.tlv_len()
    }

    /// Gateway that accepts and confirms everything, recording submissions.
    /// Calls must arrive in order: rent, mint envelope, confirmation, then
    /// the associated account envelope.
    fn recording_gateway(sent: Arc<Mutex<Vec<Transaction>>>, uri: &'static str) -> MockGateway {
        let mut seq = Sequence::new();
        let mut gateway = MockGateway::new();
        let expected_len = expected_funded_len(uri);
        gateway
            .expect_get_minimum_balance_for_rent_exemption()
            .withf(move |len| *len == expected_len)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RENT));
        for envelope in 0..2 {
            gateway
                .expect_get_latest_blockhash()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Ok(Blockhash::new([8u8; 32])));
            let sent = sent.clone();
            gateway
                .expect_send_transaction()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |tx| {
                    sent.lock().unwrap().push(tx.clone());
                    Ok(*tx.signature().unwrap())
                });
            if envelope == 0 {
                gateway
                    .expect_confirm_transaction()
                    .times(1)
                    .in_sequence(&mut seq)
                    .returning(|_| Ok(true));
            }
        }
        gateway
    }

    #[tokio::test]
    async fn builds_two_sequenced_envelopes() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let wallet = testing::wallet();
        let owner = wallet.address();
        let session = testing::session(
            recording_gateway(sent.clone(), DEFAULT_METADATA_URI),
            wallet,
        );

        let receipt = create_token(&session, params(6, 1000)).await.unwrap();
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);

        let mint_envelope = &sent[0];
        let programs: Vec<Address> = mint_envelope
            .instructions()
            .iter()
            .map(|ix| ix.program_id)
            .collect();
        assert_eq!(
            programs,
            vec![
                system::SYSTEM_PROGRAM_ID,
                TOKEN_2022_PROGRAM_ID,
                TOKEN_2022_PROGRAM_ID,
                TOKEN_2022_PROGRAM_ID
            ]
        );
        assert_eq!(mint_envelope.co_signers().unwrap(), vec![receipt.mint]);
        assert!(mint_envelope.is_fully_signed());
        assert_eq!(mint_envelope.fee_payer(), Some(&owner));

        let create = &mint_envelope.instructions()[0];
        assert_eq!(&create.data[4..12], &RENT.to_le_bytes());
        assert_eq!(&create.data[12..20], &234u64.to_le_bytes());

        let distribution = &sent[1];
        assert_eq!(distribution.instructions().len(), 2);
        assert_eq!(
            distribution.instructions()[0].program_id,
            ASSOCIATED_TOKEN_PROGRAM_ID
        );
        assert_eq!(distribution.instructions()[0].data, vec![0]);
        let mint_to = &distribution.instructions()[1];
        assert_eq!(mint_to.data[0], 7);
        assert_eq!(&mint_to.data[1..9], &1_000_000_000u64.to_le_bytes());
        assert!(distribution.co_signers().unwrap().is_empty());

        assert_eq!(receipt.base_units, 1_000_000_000);
        assert_eq!(
            receipt.associated_account,
            derive_associated_token_address(&owner, &receipt.mint, &TOKEN_2022_PROGRAM_ID)
                .unwrap()
        );
        assert_eq!(
            receipt.to_string(),
            format!("Token created successfully! Mint: {}", receipt.mint)
        );
    }

    #[tokio::test]
    async fn idempotent_ata_when_configured() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let wallet = testing::wallet();
        let config = crate::config::ToolkitConfig {
            idempotent_associated_account: true,
            ..Default::default()
        };
        let session = Session::new(
            Arc::new(recording_gateway(sent.clone(), DEFAULT_METADATA_URI)),
            wallet,
            config,
        );

        create_token(&session, params(9, 1)).await.unwrap();
        assert_eq!(sent.lock().unwrap()[1].instructions()[0].data, vec![1]);
    }

    #[tokio::test]
    async fn out_of_range_inputs_fail_before_any_call() {
        let cases = [
            (params(0, 10), ValidationError::DecimalsOutOfRange(0)),
            (params(10, 10), ValidationError::DecimalsOutOfRange(10)),
            (params(6, 0), ValidationError::NonPositiveSupply),
        ];
        for (params, expected) in cases {
            let session = testing::session(testing::silent_gateway(), testing::wallet());
            let err = create_token(&session, params).await.unwrap_err();
            assert_eq!(err, ToolkitError::Validation(expected));
        }

        let session = testing::session(testing::silent_gateway(), testing::wallet());
        let err = create_token(&session, params(9, u64::MAX)).await.unwrap_err();
        assert!(matches!(
            err,
            ToolkitError::Validation(ValidationError::SupplyOverflow(_))
        ));
    }

    #[tokio::test]
    async fn envelope_one_failure_stops_the_protocol() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_minimum_balance_for_rent_exemption()
            .returning(|_| Ok(RENT));
        gateway
            .expect_get_latest_blockhash()
            .times(1)
            .returning(|| Ok(Blockhash::new([8u8; 32])));
        gateway.expect_send_transaction().times(1).returning(|_| {
            Err(GatewayError::Rpc {
                code: -32002,
                message: "insufficient funds for rent".into(),
            })
        });
        gateway.expect_confirm_transaction().never();

        let session = testing::session(gateway, testing::wallet());
        let err = create_token(&session, params(6, 1000)).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::Transport);
        assert!(err.to_string().contains("insufficient funds for rent"));
    }

    #[tokio::test]
    async fn unconfirmed_mint_stops_the_protocol() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_get_minimum_balance_for_rent_exemption()
            .returning(|_| Ok(RENT));
        gateway
            .expect_get_latest_blockhash()
            .times(1)
            .returning(|| Ok(Blockhash::new([8u8; 32])));
        gateway
            .expect_send_transaction()
            .times(1)
            .returning(|tx| Ok(*tx.signature().unwrap()));
        gateway
            .expect_confirm_transaction()
            .times(1)
            .returning(|_| Ok(false));

        let session = testing::session(gateway, testing::wallet());
        let err = create_token(&session, params(6, 1000)).await.unwrap_err();
        assert_eq!(err.reason_code(), ReasonCode::Transport);
        assert!(err.to_string().contains("not confirmed"));
    }

    #[tokio::test]
    async fn form_uses_image_url_and_resets_on_success() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let uri = "https://example.org/logo.png";
        let session = testing::session(recording_gateway(sent.clone(), uri), testing::wallet());

        let mut form = TokenForm {
            name: "Test".into(),
            symbol: "TST".into(),
            image_url: uri.into(),
            decimals: 2,
            supply: 50,
        };
        let receipt = create_token_from_form(&session, &mut form).await.unwrap();
        assert_eq!(receipt.base_units, 5_000);
        assert_eq!(form, TokenForm::default());
    }

    #[tokio::test]
    async fn form_resets_on_failure() {
        let session = testing::session(testing::silent_gateway(), testing::wallet());
        let mut form = TokenForm {
            name: "Test".into(),
            symbol: "TST".into(),
            image_url: String::new(),
            decimals: 12,
            supply: 5,
        };

        assert!(create_token_from_form(&session, &mut form).await.is_err());
        assert_eq!(form, TokenForm::default());
        assert_eq!(form.decimals, 9);
        assert_eq!(form.supply, 0);
    }

    #[test]
    fn blank_uri_falls_back_to_default() {
        let mut p = params(9, 1);
        assert_eq!(p.resolved_uri("https://default"), "https://default");
        p.uri = Some("   ".into());
        assert_eq!(p.resolved_uri("https://default"), "https://default");
        p.uri = Some("https://mine".into());
        assert_eq!(p.resolved_uri("https://default"), "https://mine");
    }
}
