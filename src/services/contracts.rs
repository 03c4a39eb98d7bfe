use serde::Serialize;
use tracing::warn;

use crate::models::{Contract, ContractStatus, Quote};

/// A contract together with the quote it was signed from, when that quote is known.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContractSummary {
    pub contract: Contract,
    pub quote: Option<Quote>,
}

impl ContractSummary {
    pub fn quote_number(&self) -> Option<&str> {
        self.quote.as_ref().map(|q| q.quote_number.as_str())
    }
}

pub fn find_quote<'a>(contract: &Contract, quotes: &'a [Quote]) -> Option<&'a Quote> {
    quotes.iter().find(|quote| quote.id == contract.quote_id)
}

/// Joins every contract to its originating quote. Contracts whose quote is missing
/// are kept with `quote: None`.
pub fn attach_quotes(contracts: &[Contract], quotes: &[Quote]) -> Vec<ContractSummary> {
    contracts
        .iter()
        .map(|contract| {
            let quote = find_quote(contract, quotes).cloned();
            if quote.is_none() {
                warn!(
                    contract_number = %contract.contract_number,
                    quote_id = %contract.quote_id,
                    "Contract references an unknown quote"
                );
            }
            ContractSummary {
                contract: contract.clone(),
                quote,
            }
        })
        .collect()
}

pub fn active_contracts(contracts: &[Contract]) -> Vec<&Contract> {
    contracts
        .iter()
        .filter(|contract| contract.status == ContractStatus::Active)
        .collect()
}
