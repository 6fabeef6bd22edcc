//! GoogleSQL statements issued by the data science nodes.

use config::Parameters;

/// Columns the model is trained on.
pub const FEATURE_COLUMNS: [&str; 5] = [
    "engines",
    "passenger_capacity",
    "crew",
    "d_check_complete",
    "moon_clearance_complete",
];

/// Column the model predicts.
pub const LABEL_COLUMN: &str = "price";

/// Fraction of the input held out for evaluation during training.
pub const SUBSAMPLE: f64 = 0.2;

/// Features followed by the label, comma separated.
fn input_columns() -> String {
    let mut columns = FEATURE_COLUMNS.to_vec();
    columns.push(LABEL_COLUMN);
    columns.join(", ")
}

/// Builds the statement that creates (or replaces) the linear regression model.
#[must_use]
pub fn train_model_query(parameters: &Parameters) -> String {
    format!(
        "CREATE OR REPLACE MODEL `{model}` \
         OPTIONS(model_type='linear_reg', input_label_cols=['{LABEL_COLUMN}'], \
         data_split_method='random', subsample={SUBSAMPLE}) \
         AS SELECT {columns} FROM `{table}`",
        model = parameters.bq_model_name,
        table = parameters.bq_master_table,
        columns = input_columns(),
    )
}

/// Builds the statement that evaluates the model against the master table.
#[must_use]
pub fn evaluate_model_query(parameters: &Parameters) -> String {
    format!(
        "SELECT r2_score FROM ML.EVALUATE(MODEL `{model}`, \
         (SELECT {columns} FROM `{table}`))",
        model = parameters.bq_model_name,
        table = parameters.bq_master_table,
        columns = input_columns(),
    )
}
