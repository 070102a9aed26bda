// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "en";

// (chave, pt, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_failed", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("required", "Campo obrigatório.", "This field is required."),
    ("too_long", "Valor excede o tamanho máximo.", "Value exceeds the maximum length."),
    ("invalid_email", "O e-mail fornecido é inválido.", "The e-mail address is invalid."),
    ("password_too_short", "A senha deve ter no mínimo 8 caracteres.", "Password must be at least 8 characters long."),
    ("invalid_slug", "Identificador deve ter entre 2 e 100 caracteres.", "Slug must be between 2 and 100 characters."),
    ("invalid_otp_format", "O código deve ter 6 dígitos.", "The code must have 6 digits."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("user_inactive", "Usuário desativado.", "User is deactivated."),
    ("invalid_otp", "Código de verificação inválido.", "Invalid verification code."),
    ("otp_expired", "Código de verificação expirado.", "Verification code expired."),
    ("otp_attempts_exceeded", "Número máximo de tentativas atingido. Solicite um novo código.", "Too many attempts. Request a new code."),
    ("forbidden", "Você não tem permissão para realizar esta ação.", "You are not allowed to perform this action."),
    ("tenant_context_missing", "O cabeçalho X-Tenant-ID é obrigatório.", "The X-Tenant-ID header is required."),
    ("tenant_access_denied", "Você não tem acesso a esta organização.", "You do not have access to this organization."),
    ("tenant_inactive", "Organização desativada.", "Organization is deactivated."),
    ("trial_expired", "O período de teste terminou.", "The trial period has ended."),
    ("tenant_slug_exists", "O identificador '{0}' já está em uso.", "The slug '{0}' is already taken."),
    ("user_already_in_tenant", "O usuário já pertence a outra organização.", "User already belongs to another organization."),
    ("branch_not_in_tenant", "Filial inválida para esta organização.", "Branch does not belong to this organization."),
    ("module_disabled", "O módulo '{0}' não está habilitado.", "Module '{0}' is not enabled."),
    ("module_not_found", "Módulo '{0}' não encontrado.", "Module '{0}' not found."),
    ("core_module_locked", "O módulo '{0}' é essencial e não pode ser desligado.", "Module '{0}' is a core module and cannot be disabled."),
    ("invalid_date_range", "A data inicial deve ser anterior à final.", "Start date must be before end date."),
    ("fiscal_year_overlap", "O período sobrepõe outro exercício.", "The period overlaps another fiscal year."),
    ("fiscal_year_locked", "O exercício fiscal está travado.", "The fiscal year is locked."),
    ("fiscal_year_has_drafts", "Existem lançamentos não efetivados neste exercício.", "There are unposted entries in this fiscal year."),
    ("fiscal_year_excludes_entries", "O novo período deixaria lançamentos de fora.", "The new period would exclude existing entries."),
    ("no_fiscal_year_for_date", "Nenhum exercício fiscal contém a data {0}.", "No fiscal year contains {0}."),
    ("date_outside_fiscal_year", "A data do lançamento está fora do exercício.", "Entry date is outside the fiscal year."),
    ("account_cycle", "A conta não pode ser subordinada a si mesma.", "An account cannot be nested under itself."),
    ("account_type_mismatch", "A conta pai deve ser do mesmo tipo.", "Parent account must have the same type."),
    ("account_inactive", "Conta inativa.", "Account is inactive."),
    ("account_not_postable", "Contas sintéticas não recebem lançamentos.", "Summary accounts cannot receive postings."),
    ("account_has_children", "A conta possui subcontas.", "The account has sub-accounts."),
    ("account_in_use", "A conta possui lançamentos.", "The account has journal lines."),
    ("journal_min_lines", "O lançamento precisa de pelo menos duas partidas.", "An entry needs at least two lines."),
    ("journal_invalid_line", "A partida {0} deve ter apenas débito ou apenas crédito, positivo.", "Line {0} must have exactly one positive side."),
    ("journal_zero_total", "O lançamento não pode ter valor zero.", "The entry total cannot be zero."),
    ("journal_unbalanced", "Débitos ({0}) e créditos ({1}) não conferem.", "Debits ({0}) and credits ({1}) do not match."),
    ("entry_already_posted", "Lançamento já efetivado não pode ser alterado.", "Posted entries cannot be changed."),
    ("entry_not_posted", "Apenas lançamentos efetivados podem ser estornados.", "Only posted entries can be reversed."),
    ("entry_already_reversed", "Este lançamento já foi estornado.", "This entry was already reversed."),
    ("not_found", "Registro não encontrado ({0}).", "Record not found ({0})."),
    ("unique_violation", "Registro duplicado ({0}).", "Duplicate record ({0})."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Catálogo de mensagens por idioma.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let mut pt = HashMap::new();
        let mut en = HashMap::new();
        for (key, pt_msg, en_msg) in MESSAGES {
            pt.insert(*key, *pt_msg);
            en.insert(*key, *en_msg);
        }

        let mut messages = HashMap::new();
        messages.insert("pt", pt);
        messages.insert("en", en);
        Self { messages }
    }
}

impl I18nStore {
    pub fn global() -> &'static I18nStore {
        static STORE: OnceLock<I18nStore> = OnceLock::new();
        STORE.get_or_init(I18nStore::default)
    }

    /// Busca a mensagem no idioma pedido, cai para inglês e por fim devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str, params: &[&str]) -> String {
        let template = self
            .messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .copied()
            .unwrap_or(key);

        params
            .iter()
            .enumerate()
            .fold(template.to_string(), |msg, (i, value)| msg.replace(&format!("{{{i}}}"), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_with_fallbacks() {
        let store = I18nStore::default();
        assert_eq!(store.translate("pt", "account_inactive", &[]), "Conta inativa.");
        assert_eq!(store.translate("fr", "account_inactive", &[]), "Account is inactive.");
        assert_eq!(store.translate("pt", "sem_chave", &[]), "sem_chave");
    }

    #[test]
    fn interpolates_positional_params() {
        let store = I18nStore::default();
        let msg = store.translate("en", "journal_unbalanced", &["10.00", "9.00"]);
        assert_eq!(msg, "Debits (10.00) and credits (9.00) do not match.");
    }

    #[test]
    fn every_key_has_both_languages() {
        let store = I18nStore::default();
        for (key, _, _) in MESSAGES {
            assert_ne!(store.translate("pt", key, &[]), *key);
            assert_ne!(store.translate("en", key, &[]), *key);
        }
    }
}
