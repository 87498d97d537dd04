use donation_engine::{
    db_types::{
        CommittedTransition,
        Donation,
        DonationLookup,
        MinorUnits,
        NewDonation,
        OrderId,
        PaymentId,
        Program,
        ProgramId,
        PropagationTicket,
        ReferralCode,
        ReferralCodeId,
        ResolvedReferral,
        StatusChange,
    },
    AggregateStore,
    DonationLedger,
    GatewayError,
    GatewayOrder,
    GatewayPayment,
    LedgerError,
    PaymentGatewayClient,
    ReferralManagement,
};
use mockall::mock;

mock! {
    pub Ledger {}
    impl Clone for Ledger {
        fn clone(&self) -> Self;
    }
    impl DonationLedger for Ledger {
        async fn insert_donation(&self, donation: NewDonation) -> Result<Donation, LedgerError>;
        async fn fetch_donation(&self, lookup: &DonationLookup) -> Result<Option<Donation>, LedgerError>;
        async fn transition_status(&self, change: StatusChange) -> Result<Option<CommittedTransition>, LedgerError>;
        async fn record_authorized_payment(&self, order_id: &OrderId, payment_id: &PaymentId) -> Result<Option<Donation>, LedgerError>;
    }
    impl AggregateStore for Ledger {
        async fn apply_propagation(&self, ticket: &PropagationTicket) -> Result<bool, LedgerError>;
        async fn fetch_pending_propagations(&self, limit: i64) -> Result<Vec<PropagationTicket>, LedgerError>;
        async fn fetch_program(&self, id: &ProgramId) -> Result<Option<Program>, LedgerError>;
        async fn fetch_referral_code(&self, id: &ReferralCodeId) -> Result<Option<ReferralCode>, LedgerError>;
        async fn recompute_program_totals(&self, id: &ProgramId) -> Result<Program, LedgerError>;
        async fn recompute_referral_totals(&self, id: &ReferralCodeId) -> Result<ReferralCode, LedgerError>;
    }
    impl ReferralManagement for Ledger {
        async fn resolve_referral_code(&self, code: &str) -> Result<Option<ResolvedReferral>, LedgerError>;
    }
}

mock! {
    pub Gateway {}
    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGatewayClient for Gateway {
        async fn create_order(&self, amount: MinorUnits, currency: &str, receipt: &str) -> Result<GatewayOrder, GatewayError>;
        async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<GatewayPayment, GatewayError>;
    }
}
