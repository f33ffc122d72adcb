//! Entity model to transport DTO conversions.

use common::{BalanceDto, TransactionDto};
use model::entities::{balance, expense, income};

pub fn balance_to_dto(model: &balance::Model) -> BalanceDto {
    BalanceDto {
        id: model.id.clone(),
        user_id: model.user_id.clone(),
        amount: model.amount,
        start_date: model.start_date,
        end_date: model.end_date,
        created_at: model.created_at,
    }
}

pub fn expense_to_dto(model: &expense::Model) -> TransactionDto {
    TransactionDto {
        id: model.id.clone(),
        amount: model.amount,
        description: model.description.clone(),
        date: model.date,
        balance_id: model.balance_id.clone(),
        created_at: model.created_at,
    }
}

pub fn income_to_dto(model: &income::Model) -> TransactionDto {
    TransactionDto {
        id: model.id.clone(),
        amount: model.amount,
        description: model.description.clone(),
        date: model.date,
        balance_id: model.balance_id.clone(),
        created_at: model.created_at,
    }
}
