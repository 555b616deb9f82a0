//! # Instruction Builder
//!
//! Turns a transition plus its caller into a fully addressed instruction.
//! Every account except the caller and the system program is derived.

use crate::domain::{
    AccountMeta, Address, InitializeArgs, Instruction, MutationKind, SyncError,
    SYSTEM_PROGRAM_ID,
};

use super::derivation::AddressDeriver;

/// Builds program instructions for one deployment.
#[derive(Clone, Copy, Debug)]
pub struct InstructionBuilder {
    deriver: AddressDeriver,
}

impl InstructionBuilder {
    /// Builder sharing `deriver`'s program id.
    pub fn new(deriver: AddressDeriver) -> Self {
        Self { deriver }
    }

    fn request(&self, kind: MutationKind, accounts: Vec<AccountMeta>, args: &[u8]) -> Instruction {
        let mut data = Vec::with_capacity(8 + args.len());
        data.extend_from_slice(&kind.discriminator());
        data.extend_from_slice(args);
        Instruction::new_with_bytes(self.deriver.program_id(), &data, accounts)
    }

    fn cycle_of(&self, admin: &Address) -> Result<(Address, Address), SyncError> {
        let (config, _) = self.deriver.config_address(admin)?;
        let (vault, _) = self.deriver.vault_address(&config)?;
        Ok((config, vault))
    }

    /// `initialize`: admin, config, vault, system program.
    pub fn initialize(
        &self,
        admin: &Address,
        args: &InitializeArgs,
    ) -> Result<Instruction, SyncError> {
        let (config, vault) = self.cycle_of(admin)?;
        let encoded = bincode::serialize(args)
            .map_err(|e| SyncError::precondition(format!("unencodable arguments: {e}")))?;
        Ok(self.request(
            MutationKind::Initialize,
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(config, false),
                AccountMeta::new(vault, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &encoded,
        ))
    }

    /// `add_beneficiary`: admin, config, wallet, beneficiary, system program.
    pub fn add_beneficiary(
        &self,
        admin: &Address,
        wallet: &Address,
    ) -> Result<Instruction, SyncError> {
        let (config, _) = self.deriver.config_address(admin)?;
        let (beneficiary, _) = self.deriver.beneficiary_address(&config, wallet)?;
        Ok(self.request(
            MutationKind::AddBeneficiary,
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(config, false),
                AccountMeta::new_readonly(*wallet, false),
                AccountMeta::new(beneficiary, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &[],
        ))
    }

    fn beneficiary_transfer(
        &self,
        kind: MutationKind,
        wallet: &Address,
        config: &Address,
        config_writable: bool,
    ) -> Result<Instruction, SyncError> {
        let (beneficiary, _) = self.deriver.beneficiary_address(config, wallet)?;
        let (vault, _) = self.deriver.vault_address(config)?;
        let config_meta = if config_writable {
            AccountMeta::new(*config, false)
        } else {
            AccountMeta::new_readonly(*config, false)
        };
        Ok(self.request(
            kind,
            vec![
                AccountMeta::new(*wallet, true),
                config_meta,
                AccountMeta::new(beneficiary, false),
                AccountMeta::new(vault, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &[],
        ))
    }

    /// `deposit_collateral`: wallet, config, beneficiary, vault, system program.
    pub fn deposit_collateral(
        &self,
        wallet: &Address,
        config: &Address,
    ) -> Result<Instruction, SyncError> {
        self.beneficiary_transfer(MutationKind::DepositCollateral, wallet, config, false)
    }

    /// `deposit_monthly`: same accounts as `deposit_collateral`.
    pub fn deposit_monthly(
        &self,
        wallet: &Address,
        config: &Address,
    ) -> Result<Instruction, SyncError> {
        self.beneficiary_transfer(MutationKind::DepositMonthly, wallet, config, false)
    }

    /// `withdraw`: wallet, config (advances the rotation), beneficiary, vault, system program.
    pub fn withdraw(
        &self,
        wallet: &Address,
        config: &Address,
    ) -> Result<Instruction, SyncError> {
        self.beneficiary_transfer(MutationKind::Withdraw, wallet, config, true)
    }

    /// `punish`: admin, config, target beneficiary.
    pub fn punish(
        &self,
        admin: &Address,
        target_wallet: &Address,
    ) -> Result<Instruction, SyncError> {
        let (config, _) = self.deriver.config_address(admin)?;
        let (beneficiary, _) = self.deriver.beneficiary_address(&config, target_wallet)?;
        Ok(self.request(
            MutationKind::Punish,
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new_readonly(config, false),
                AccountMeta::new(beneficiary, false),
            ],
            &[],
        ))
    }

    /// `enable_claiming`: admin, config, vault, (no beneficiary), system program.
    ///
    /// The optional beneficiary slot is filled with the program id, which
    /// the program reads as "absent".
    pub fn enable_claiming(&self, admin: &Address) -> Result<Instruction, SyncError> {
        let (config, vault) = self.cycle_of(admin)?;
        Ok(self.request(
            MutationKind::EnableClaiming,
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(config, false),
                AccountMeta::new(vault, false),
                AccountMeta::new_readonly(self.deriver.program_id(), false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &[],
        ))
    }

    /// `claim_collateral`: wallet, config, vault, beneficiary, system program.
    pub fn claim_collateral(
        &self,
        wallet: &Address,
        config: &Address,
    ) -> Result<Instruction, SyncError> {
        let (vault, _) = self.deriver.vault_address(config)?;
        let (beneficiary, _) = self.deriver.beneficiary_address(config, wallet)?;
        Ok(self.request(
            MutationKind::ClaimCollateral,
            vec![
                AccountMeta::new(*wallet, true),
                AccountMeta::new(*config, false),
                AccountMeta::new(vault, false),
                AccountMeta::new(beneficiary, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &[],
        ))
    }

    /// `exit`: admin, config, vault, system program.
    pub fn exit(&self, admin: &Address) -> Result<Instruction, SyncError> {
        let (config, vault) = self.cycle_of(admin)?;
        Ok(self.request(
            MutationKind::Exit,
            vec![
                AccountMeta::new(*admin, true),
                AccountMeta::new(config, false),
                AccountMeta::new(vault, false),
                AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            ],
            &[],
        ))
    }
}
