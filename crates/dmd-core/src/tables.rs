//! Column tables for every published feed.

use crate::feed::FeedId;
use crate::schema::{
    ColumnSpec, ColumnType, FeedSchema, RowFilter, TimestampFormat, MESSAGE_TIMESTAMP_PATTERN,
};

const ISO: ColumnType = ColumnType::Timestamp(TimestampFormat::Iso);
const MESSAGE_TIME: ColumnType =
    ColumnType::Timestamp(TimestampFormat::Pattern(MESSAGE_TIMESTAMP_PATTERN));

/// Looks up the schema for `feed`.
pub fn schema_for(feed: FeedId) -> &'static FeedSchema {
    match feed {
        FeedId::TurquoiseUkPreTrade => &TRQX_PRE_TRADE,
        FeedId::TurquoiseUkPostTrade => &TRQX_POST_TRADE,
        FeedId::TurquoiseEuropePreTrade => &TQEX_PRE_TRADE,
        FeedId::TurquoiseEuropePostTrade => &TQEX_POST_TRADE,
        FeedId::LsePreTrade => &XLON_PRE_DELAYED,
        FeedId::LsePostTrade => &XLON_POST_DELAYED,
        FeedId::TradechoUkPostTrade => &ECHO_POST_TRADE,
        FeedId::TradechoNlPostTrade => &ECEU_POST_TRADE,
    }
}

pub static XLON_POST_DELAYED: FeedSchema = FeedSchema {
    feed: FeedId::LsePostTrade,
    table: "xlon_post_delayed",
    title: "LSE Post-trade Delayed",
    columns: &[
        ColumnSpec::new("distribution_timestamp", "distributionTime", ISO),
        ColumnSpec::new("trading_timestamp", "tradingDateAndTime", ISO),
        ColumnSpec::new("transaction_id", "transactionIdentificationCode", ColumnType::UInt64)
            .primary_key(),
        ColumnSpec::new("instrument_id", "instrumentId", ColumnType::UInt64),
        ColumnSpec::new("isin_instrument_code", "instrumentIdentificationCode", ColumnType::Utf8),
        ColumnSpec::new("currency", "priceCurrency", ColumnType::Utf8),
        ColumnSpec::new("price", "mifidPrice", ColumnType::Float64),
        ColumnSpec::new("quantity", "mifidQuantity", ColumnType::UInt64),
    ],
    filters: &[
        RowFilter::NotInFuture {
            source: "tradingDateAndTime",
            format: TimestampFormat::Iso,
        },
        RowFilter::Present {
            source: "instrumentIdentificationCode",
        },
        RowFilter::Present {
            source: "priceCurrency",
        },
        RowFilter::NonNegative {
            source: "mifidQuantity",
        },
    ],
};

/// Market-by-order pre-trade layout; empty sizes and prices read as zero.
pub static XLON_PRE_DELAYED: FeedSchema = FeedSchema {
    feed: FeedId::LsePreTrade,
    table: "xlon_pre_trade",
    title: "LSE Pre-Trade Data",
    columns: &[
        ColumnSpec::new("message_timestamp", "Message_Timestamp", MESSAGE_TIME),
        ColumnSpec::new("rec_no", "RecNo", ColumnType::Int64),
        ColumnSpec::new("market_data_group", "Market_Data_Group", ColumnType::Int32),
        ColumnSpec::new("dss_id", "DSS_ID", ColumnType::Int64),
        ColumnSpec::new("message_type", "Message_Type", ColumnType::Utf8),
        ColumnSpec::new("order_id", "Order_ID", ColumnType::Int64),
        ColumnSpec::new("instrument_id", "Instrument_ID", ColumnType::Int64).primary_key(),
        ColumnSpec::new(
            "instrument_identification_code",
            "Instrument_Identification_Code",
            ColumnType::Utf8,
        ),
        ColumnSpec::new("currency", "Currency", ColumnType::Utf8),
        ColumnSpec::new("source_venue", "Source_Venue", ColumnType::Int32),
        ColumnSpec::new("order_book_type", "Order_Book_Type", ColumnType::Int32),
        ColumnSpec::new("side", "Side", ColumnType::Utf8),
        ColumnSpec::new("size", "Size", ColumnType::Float64).zero_when_empty(),
        ColumnSpec::new("price", "Price", ColumnType::Float64).zero_when_empty(),
        ColumnSpec::new("old_price", "Old_Price", ColumnType::Float64).zero_when_empty(),
        ColumnSpec::new("old_size", "Old_Size", ColumnType::Float64).zero_when_empty(),
    ],
    filters: &[],
};

pub static TRQX_PRE_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TurquoiseUkPreTrade,
    table: "trqx_pre_trade",
    title: "TRQX Pre-Trade Data",
    columns: &[
        ColumnSpec::new("message_timestamp", "Message_Timestamp", MESSAGE_TIME),
        ColumnSpec::new("rec_no", "RecNo", ColumnType::UInt64),
        ColumnSpec::new("market_data_group", "Market_Data_Group", ColumnType::UInt8),
        ColumnSpec::new("dss_id", "DSS_ID", ColumnType::UInt64),
        ColumnSpec::new("message_type", "Message_Type", ColumnType::Utf8),
        ColumnSpec::new("order_id", "Order_ID", ColumnType::UInt64),
        ColumnSpec::new("instrument_id", "Instrument_ID", ColumnType::UInt64).primary_key(),
        ColumnSpec::new(
            "instrument_identification_code",
            "Instrument_Identification_Code",
            ColumnType::Utf8,
        ),
        ColumnSpec::new("currency", "Currency", ColumnType::Utf8),
        ColumnSpec::new("source_venue", "Source_Venue", ColumnType::UInt8),
        ColumnSpec::new("order_book_type", "Order_Book_Type", ColumnType::UInt8),
        ColumnSpec::new("side", "Side", ColumnType::Utf8),
        ColumnSpec::new("size", "Size", ColumnType::Float64),
        ColumnSpec::new("price", "Price", ColumnType::Float64),
        ColumnSpec::new("old_price", "Old_Price", ColumnType::Float64).null_when_empty(),
        ColumnSpec::new("old_size", "Old_Size", ColumnType::Float64).null_when_empty(),
    ],
    filters: &[],
};

pub static TQEX_PRE_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TurquoiseEuropePreTrade,
    table: "tqex_pre_trade",
    title: "TQEX Pre-Trade Data",
    columns: &[
        ColumnSpec::new("distribution_time", "distributionTime", ISO),
        ColumnSpec::new("instrument_id", "instrumentId", ColumnType::UInt64).primary_key(),
        ColumnSpec::new("source_venue", "sourceVenue", ColumnType::UInt8),
        ColumnSpec::new("bid_market_size", "bidMarketSize", ColumnType::Float64),
        ColumnSpec::new("bid_limit_price", "bidLimitPrice", ColumnType::Float64),
        ColumnSpec::new("bid_yield", "bidYield", ColumnType::Float64),
        ColumnSpec::new("bid_limit_size", "bidLimitSize", ColumnType::Float64),
        ColumnSpec::new("offer_market_size", "offerMarketSize", ColumnType::Float64),
        ColumnSpec::new("offer_limit_price", "offerLimitPrice", ColumnType::Float64),
        ColumnSpec::new("offer_yield", "offerYield", ColumnType::Float64),
        ColumnSpec::new("offer_limit_size", "offerLimitSize", ColumnType::Float64),
        ColumnSpec::new("order_book_type", "orderBookType", ColumnType::UInt8),
        ColumnSpec::new(
            "instrument_identification_code",
            "instrumentIdentificationCode",
            ColumnType::Utf8,
        ),
    ],
    filters: &[],
};

/// MiFID post-trade layout shared by both Turquoise books.
const TURQUOISE_POST_TRADE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("distribution_time", "distributionTime", ISO),
    ColumnSpec::new("source_venue", "sourceVenue", ColumnType::UInt8),
    ColumnSpec::new("instrument_id", "instrumentId", ColumnType::UInt64),
    ColumnSpec::new(
        "transaction_identification_code",
        "transactionIdentificationCode",
        ColumnType::UInt64,
    )
    .primary_key(),
    ColumnSpec::new("mifid_price", "mifidPrice", ColumnType::Float64),
    ColumnSpec::new("mifid_quantity", "mifidQuantity", ColumnType::UInt64),
    ColumnSpec::new("trading_date_and_time", "tradingDateAndTime", ISO),
    ColumnSpec::new(
        "instrument_identification_code_type",
        "instrumentIdentificationCodeType",
        ColumnType::Utf8,
    ),
    ColumnSpec::new(
        "instrument_identification_code",
        "instrumentIdentificationCode",
        ColumnType::Utf8,
    ),
    ColumnSpec::new("price_notation", "priceNotation", ColumnType::Utf8),
    ColumnSpec::new("price_currency", "priceCurrency", ColumnType::Utf8),
    ColumnSpec::new("notional_amount", "notionalAmount", ColumnType::Float64).null_when_empty(),
    ColumnSpec::new("notional_currency", "notionalCurrency", ColumnType::Utf8),
    ColumnSpec::new("venue_of_execution", "venueOfExecution", ColumnType::Utf8),
    ColumnSpec::new("publication_date_and_time", "publicationDateAndTime", ISO),
    ColumnSpec::new("transaction_to_be_cleared", "transactionToBeCleared", ColumnType::Bool),
    ColumnSpec::new("measurement_unit", "measurementUnit", ColumnType::Utf8),
    ColumnSpec::new(
        "quantity_in_measurement_unit",
        "quantityInMeasurementUnit",
        ColumnType::Float64,
    )
    .null_when_empty(),
    ColumnSpec::new("type", "type", ColumnType::Utf8),
    ColumnSpec::new("mifid_flags", "mifidFlags", ColumnType::Utf8),
];

pub static TQEX_POST_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TurquoiseEuropePostTrade,
    table: "tqex_post_trade",
    title: "TQEX Post-Trade Data",
    columns: TURQUOISE_POST_TRADE_COLUMNS,
    filters: &[],
};

pub static TRQX_POST_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TurquoiseUkPostTrade,
    table: "trqx_post_trade",
    title: "TRQX Post-Trade Data",
    columns: TURQUOISE_POST_TRADE_COLUMNS,
    filters: &[],
};

/// TRADEcho post-trade layout, which adds publication venue, trade count
/// and third-country fields to the MiFID set.
const TRADECHO_POST_TRADE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("distribution_time", "distributionTime", ISO),
    ColumnSpec::new("source_venue", "sourceVenue", ColumnType::UInt8),
    ColumnSpec::new("instrument_id", "instrumentId", ColumnType::UInt64),
    ColumnSpec::new(
        "transaction_identification_code",
        "transactionIdentificationCode",
        ColumnType::UInt64,
    )
    .primary_key(),
    ColumnSpec::new("mifid_price", "mifidPrice", ColumnType::Float64),
    ColumnSpec::new("mifid_quantity", "mifidQuantity", ColumnType::UInt64),
    ColumnSpec::new("trading_date_and_time", "tradingDateAndTime", ISO),
    ColumnSpec::new(
        "instrument_identification_code_type",
        "instrumentIdentificationCodeType",
        ColumnType::Utf8,
    ),
    ColumnSpec::new(
        "instrument_identification_code",
        "instrumentIdentificationCode",
        ColumnType::Utf8,
    ),
    ColumnSpec::new("price_notation", "priceNotation", ColumnType::Utf8),
    ColumnSpec::new("price_currency", "priceCurrency", ColumnType::Utf8),
    ColumnSpec::new("notional_amount", "notionalAmount", ColumnType::Float64),
    ColumnSpec::new("notional_currency", "notionalCurrency", ColumnType::Utf8),
    ColumnSpec::new("venue_of_execution", "venueOfExecution", ColumnType::Utf8),
    ColumnSpec::new("publication_date_and_time", "publicationDateAndTime", ISO),
    ColumnSpec::new("transaction_to_be_cleared", "transactionToBeCleared", ColumnType::Bool),
    ColumnSpec::new("measurement_unit", "measurementUnit", ColumnType::Utf8),
    ColumnSpec::new(
        "quantity_in_measurement_unit",
        "quantityInMeasurementUnit",
        ColumnType::Float64,
    )
    .null_when_empty(),
    ColumnSpec::new("type", "type", ColumnType::Utf8),
    ColumnSpec::new("venue_of_publication", "venueOfPublication", ColumnType::Utf8),
    ColumnSpec::new("mifid_flags", "mifidFlags", ColumnType::Utf8),
    ColumnSpec::new(
        "total_number_of_transactions",
        "totalNumberOfTransactions",
        ColumnType::UInt64,
    ),
    ColumnSpec::new(
        "third_country_trading_venue_of_execution",
        "thirdCountryTradingVenueOfExecution",
        ColumnType::Utf8,
    ),
    ColumnSpec::new("missing_price", "missingPrice", ColumnType::Float64).null_when_empty(),
];

pub static ECEU_POST_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TradechoNlPostTrade,
    table: "eceu_post_trade",
    title: "ECEU Post-Trade Data",
    columns: TRADECHO_POST_TRADE_COLUMNS,
    filters: &[],
};

pub static ECHO_POST_TRADE: FeedSchema = FeedSchema {
    feed: FeedId::TradechoUkPostTrade,
    table: "echo_post_trade",
    title: "ECHO Post-Trade Data",
    columns: TRADECHO_POST_TRADE_COLUMNS,
    filters: &[],
};
