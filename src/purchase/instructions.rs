//! Instruction planning for a mint transaction
//!
//! Order within the transaction:
//! 1. Compute budget instructions (CU limit, priority fee), when configured
//! 2. Create and initialize the new mint account
//! 3. Create the payer's associated token account for it
//! 4. Mint exactly one token into that account
//! 5. The sale program's `mint_nft`

use solana_sdk::{
    compute_budget::{self, ComputeBudgetInstruction},
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction, system_program, sysvar,
};
use spl_token::solana_program::program_pack::Pack;

use crate::addresses::{MintAddresses, ProgramIds};
use crate::candy_machine::{mint_nft_instruction, MintNftAccounts};
use crate::purchase::errors::MintError;

/// Size of an SPL token mint account
pub const MINT_ACCOUNT_LEN: usize = spl_token::state::Mint::LEN;

/// Inputs to one mint transaction
#[derive(Debug, Clone, Copy)]
pub struct MintPlanInputs {
    pub payer: Pubkey,
    pub mint: Pubkey,
    pub config: Pubkey,
    pub treasury: Pubkey,
    pub addresses: MintAddresses,
    /// Rent-exempt minimum for [`MINT_ACCOUNT_LEN`]
    pub mint_rent_lamports: u64,
    pub compute_unit_limit: u32,
    pub priority_fee_micro_lamports: u64,
}

/// Ordered instruction list of a mint transaction
#[derive(Debug, Clone)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,
}

/// Legacy-form associated token account creation (empty instruction data)
pub fn create_associated_token_account_instruction(
    programs: &ProgramIds,
    token_account: &Pubkey,
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: programs.associated_token,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*token_account, false),
            AccountMeta::new_readonly(*wallet, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(programs.token, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: Vec::new(),
    }
}

pub fn plan_mint_instructions(
    programs: &ProgramIds,
    inputs: &MintPlanInputs,
) -> Result<InstructionPlan, MintError> {
    let MintPlanInputs { payer, mint, .. } = *inputs;
    // compute budget (2) + create/init mint (2) + ata (1) + mint_to (1) + mint_nft (1)
    let mut instructions = Vec::with_capacity(7);

    if inputs.compute_unit_limit > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
            inputs.compute_unit_limit,
        ));
    }
    if inputs.priority_fee_micro_lamports > 0 {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
            inputs.priority_fee_micro_lamports,
        ));
    }

    instructions.push(system_instruction::create_account(
        &payer,
        &mint,
        inputs.mint_rent_lamports,
        MINT_ACCOUNT_LEN as u64,
        &programs.token,
    ));

    instructions.push(
        spl_token::instruction::initialize_mint(&programs.token, &mint, &payer, Some(&payer), 0)
            .map_err(|e| MintError::instruction_failed("spl_token", e.to_string()))?,
    );

    instructions.push(create_associated_token_account_instruction(
        programs,
        &inputs.addresses.token_account,
        &payer,
        &payer,
        &mint,
    ));

    instructions.push(
        spl_token::instruction::mint_to(
            &programs.token,
            &mint,
            &inputs.addresses.token_account,
            &payer,
            &[],
            1,
        )
        .map_err(|e| MintError::instruction_failed("spl_token", e.to_string()))?,
    );

    instructions.push(mint_nft_instruction(
        programs,
        &MintNftAccounts {
            config: inputs.config,
            payer,
            treasury: inputs.treasury,
            mint,
            addresses: inputs.addresses,
        },
    ));

    Ok(InstructionPlan { instructions })
}

/// Check the ordering invariants of a planned mint (debug builds only)
#[cfg(debug_assertions)]
pub fn sanity_check_ix_order(
    programs: &ProgramIds,
    instructions: &[Instruction],
) -> Result<(), MintError> {
    let last = instructions
        .last()
        .ok_or_else(|| MintError::invalid_order("Instruction list is empty"))?;
    if last.program_id != programs.candy_machine {
        return Err(MintError::invalid_order("mint_nft must be the last instruction"));
    }

    let mut seen_other = false;
    for (idx, ix) in instructions.iter().enumerate() {
        if ix.program_id == compute_budget::id() {
            if seen_other {
                return Err(MintError::invalid_order(format!(
                    "Compute budget instruction at index {} follows program instructions",
                    idx
                )));
            }
        } else {
            seen_other = true;
        }
    }
    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline(always)]
pub fn sanity_check_ix_order(
    _programs: &ProgramIds,
    _instructions: &[Instruction],
) -> Result<(), MintError> {
    Ok(())
}
