use sea_orm_migration::prelude::*;

/// 酒店
#[derive(DeriveIden)]
enum Hotels {
    Table,
    Id,
    Name,
    Status,
    IsSystemConnected,
    AutoConfirm,
    ProviderCode,
    CreatedAt,
    UpdatedAt,
}

/// 房型
#[derive(DeriveIden)]
enum RoomTypes {
    Table,
    Id,
    HotelId,
    Name,
    Status,
    CreatedAt,
    UpdatedAt,
}

/// 酒店每日房价库存
#[derive(DeriveIden)]
enum HotelDailyStocks {
    Table,
    Id,
    HotelId,
    RoomTypeId,
    BizDate,
    SalePrice,
    CostPrice,
    StockTotal,
    StockAvailable,
    PriceSource,
    CreatedAt,
    UpdatedAt,
}

/// 门票
#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    Name,
    Status,
    IsSystemConnected,
    AutoConfirm,
    ProviderCode,
    CreatedAt,
    UpdatedAt,
}

/// 门票每日价格
#[derive(DeriveIden)]
enum TicketPrices {
    Table,
    Id,
    TicketId,
    BizDate,
    SalePrice,
    CostPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn timestamps<T: Iden + 'static>(table: &mut TableCreateStatement, created: T, updated: T) {
    table
        .col(
            ColumnDef::new(created)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::cust("NOW()")),
        )
        .col(
            ColumnDef::new(updated)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::cust("NOW()")),
        );
}

fn money<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(12, 2)
        .not_null()
        .default(0)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut hotels = Table::create()
            .table(Hotels::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(Hotels::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Hotels::Name).string().not_null())
            .col(
                ColumnDef::new(Hotels::Status)
                    .string_len(16)
                    .not_null()
                    .default("enabled"),
            )
            .col(
                ColumnDef::new(Hotels::IsSystemConnected)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(Hotels::AutoConfirm)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(ColumnDef::new(Hotels::ProviderCode).string_len(64).null())
            .to_owned();
        timestamps(&mut hotels, Hotels::CreatedAt, Hotels::UpdatedAt);
        manager.create_table(hotels).await?;

        let mut room_types = Table::create()
            .table(RoomTypes::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(RoomTypes::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(RoomTypes::HotelId).big_integer().not_null())
            .col(ColumnDef::new(RoomTypes::Name).string().not_null())
            .col(
                ColumnDef::new(RoomTypes::Status)
                    .string_len(16)
                    .not_null()
                    .default("enabled"),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_room_types_hotel")
                    .from(RoomTypes::Table, RoomTypes::HotelId)
                    .to(Hotels::Table, Hotels::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        timestamps(&mut room_types, RoomTypes::CreatedAt, RoomTypes::UpdatedAt);
        manager.create_table(room_types).await?;

        let mut stocks = Table::create()
            .table(HotelDailyStocks::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(HotelDailyStocks::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(HotelDailyStocks::HotelId)
                    .big_integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(HotelDailyStocks::RoomTypeId)
                    .big_integer()
                    .not_null(),
            )
            .col(ColumnDef::new(HotelDailyStocks::BizDate).date().not_null())
            .col(&mut money(HotelDailyStocks::SalePrice))
            .col(&mut money(HotelDailyStocks::CostPrice))
            .col(
                ColumnDef::new(HotelDailyStocks::StockTotal)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(HotelDailyStocks::StockAvailable)
                    .integer()
                    .not_null()
                    .default(0),
            )
            .col(
                ColumnDef::new(HotelDailyStocks::PriceSource)
                    .string_len(16)
                    .not_null()
                    .default("manual"),
            )
            .to_owned();
        timestamps(
            &mut stocks,
            HotelDailyStocks::CreatedAt,
            HotelDailyStocks::UpdatedAt,
        );
        manager.create_table(stocks).await?;

        // 同一房型同一天只有一条库存
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_hotel_daily_stocks_unique")
                    .table(HotelDailyStocks::Table)
                    .col(HotelDailyStocks::HotelId)
                    .col(HotelDailyStocks::RoomTypeId)
                    .col(HotelDailyStocks::BizDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let mut tickets = Table::create()
            .table(Tickets::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(Tickets::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Tickets::Name).string().not_null())
            .col(
                ColumnDef::new(Tickets::Status)
                    .string_len(16)
                    .not_null()
                    .default("enabled"),
            )
            .col(
                ColumnDef::new(Tickets::IsSystemConnected)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(
                ColumnDef::new(Tickets::AutoConfirm)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .col(ColumnDef::new(Tickets::ProviderCode).string_len(64).null())
            .to_owned();
        timestamps(&mut tickets, Tickets::CreatedAt, Tickets::UpdatedAt);
        manager.create_table(tickets).await?;

        let mut ticket_prices = Table::create()
            .table(TicketPrices::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(TicketPrices::Id)
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(TicketPrices::TicketId).big_integer().not_null())
            .col(ColumnDef::new(TicketPrices::BizDate).date().not_null())
            .col(&mut money(TicketPrices::SalePrice))
            .col(&mut money(TicketPrices::CostPrice))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_ticket_prices_ticket")
                    .from(TicketPrices::Table, TicketPrices::TicketId)
                    .to(Tickets::Table, Tickets::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        timestamps(
            &mut ticket_prices,
            TicketPrices::CreatedAt,
            TicketPrices::UpdatedAt,
        );
        manager.create_table(ticket_prices).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ticket_prices_unique")
                    .table(TicketPrices::Table)
                    .col(TicketPrices::TicketId)
                    .col(TicketPrices::BizDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TicketPrices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HotelDailyStocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoomTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Hotels::Table).to_owned())
            .await?;
        Ok(())
    }
}
